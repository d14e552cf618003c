use std::cell::RefCell;
use std::rc::Rc;

use crate::config::{NpotMipmaps, RenderConfig};
use crate::gl::Gl;
use crate::texture::{Texture2D, TextureError};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];
const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];

/// Solid 1×1 textures substituted for absent material slots.
pub struct FallbackTextures<G: Gl> {
    pub white: Texture2D<G>,
    pub black: Texture2D<G>,
    pub normal: Texture2D<G>,
}

impl<G: Gl> FallbackTextures<G> {
    fn create(ctx: &RenderContext<G>) -> Result<Self, TextureError> {
        let white = Texture2D::solid(ctx, WHITE)?;
        let black = match Texture2D::solid(ctx, BLACK) {
            Ok(texture) => texture,
            Err(err) => {
                white.destroy(ctx);
                return Err(err);
            }
        };
        let normal = match Texture2D::solid(ctx, FLAT_NORMAL) {
            Ok(texture) => texture,
            Err(err) => {
                white.destroy(ctx);
                black.destroy(ctx);
                return Err(err);
            }
        };
        Ok(Self {
            white,
            black,
            normal,
        })
    }

    fn destroy(&self, ctx: &RenderContext<G>) {
        self.white.destroy(ctx);
        self.black.destroy(ctx);
        self.normal.destroy(ctx);
    }
}

/// One live graphics context plus the state shared by everything drawing
/// into it.
///
/// Scenes receive the context as `Rc<RenderContext<G>>`; all access happens
/// on the thread driving the frame loop.
pub struct RenderContext<G: Gl> {
    gl: G,
    npot_mipmaps: NpotMipmaps,
    fallbacks: RefCell<Option<Rc<FallbackTextures<G>>>>,
}

impl<G: Gl> RenderContext<G> {
    pub fn new(gl: G) -> Self {
        Self::with_config(gl, &RenderConfig::default())
    }

    pub fn with_config(gl: G, config: &RenderConfig) -> Self {
        Self {
            gl,
            npot_mipmaps: config.textures.npot_mipmaps,
            fallbacks: RefCell::new(None),
        }
    }

    pub fn gl(&self) -> &G {
        &self.gl
    }

    pub fn npot_mipmaps(&self) -> NpotMipmaps {
        self.npot_mipmaps
    }

    /// Returns the fallback set, creating it on first use.
    pub fn fallbacks(&self) -> Result<Rc<FallbackTextures<G>>, TextureError> {
        if let Some(existing) = self.fallbacks.borrow().as_ref() {
            return Ok(Rc::clone(existing));
        }
        let created = Rc::new(FallbackTextures::create(self)?);
        tracing::debug!("created fallback textures");
        *self.fallbacks.borrow_mut() = Some(Rc::clone(&created));
        Ok(created)
    }

    /// Destroys the fallback set. A later [`fallbacks`](Self::fallbacks)
    /// call recreates it.
    pub fn release_fallbacks(&self) {
        let released = self.fallbacks.borrow_mut().take();
        if let Some(set) = released {
            set.destroy(self);
            tracing::debug!("released fallback textures");
        }
    }
}
