use std::cell::Cell;

use image::imageops::flip_vertical_in_place;
use image::RgbaImage;

use crate::config::NpotMipmaps;
use crate::context::RenderContext;
use crate::gl::{Gl, GlError, MagFilter, MinFilter, Wrap};

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error(transparent)]
    Gl(#[from] GlError),
    #[error("mipmaps requested for non-power-of-two texture {width}x{height}")]
    NonPowerOfTwo { width: u32, height: u32 },
    #[error("invalid texture data: {width}x{height} with {len} bytes")]
    InvalidDimensions { width: u32, height: u32, len: usize },
}

/// Upload options for [`Texture2D::from_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureOptions {
    /// Flip rows so the first row of the image lands at `v = 1`.
    pub flip_y: bool,
    pub generate_mipmaps: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            flip_y: false,
            generate_mipmaps: true,
        }
    }
}

/// A GPU-resident RGBA8 image.
///
/// The handle is released by [`destroy`](Self::destroy), which may be called
/// any number of times.
pub struct Texture2D<G: Gl> {
    handle: Cell<Option<G::Texture>>,
    width: u32,
    height: u32,
}

impl<G: Gl> std::fmt::Debug for Texture2D<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture2D")
            .field("handle", &self.handle.get())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

fn is_power_of_two(n: u32) -> bool {
    n != 0 && n & (n - 1) == 0
}

impl<G: Gl> Texture2D<G> {
    pub fn from_image(
        ctx: &RenderContext<G>,
        image: &RgbaImage,
        options: TextureOptions,
    ) -> Result<Self, TextureError> {
        if options.flip_y {
            let mut flipped = image.clone();
            flip_vertical_in_place(&mut flipped);
            Self::from_rgba8(ctx, flipped.width(), flipped.height(), flipped.as_raw(), options)
        } else {
            Self::from_rgba8(ctx, image.width(), image.height(), image.as_raw(), options)
        }
    }

    /// Uploads tightly packed RGBA8 rows. `options.flip_y` is ignored here;
    /// rows are uploaded in the order given.
    pub fn from_rgba8(
        ctx: &RenderContext<G>,
        width: u32,
        height: u32,
        pixels: &[u8],
        options: TextureOptions,
    ) -> Result<Self, TextureError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(TextureError::InvalidDimensions {
                width,
                height,
                len: pixels.len(),
            });
        }

        let pot = is_power_of_two(width) && is_power_of_two(height);
        let mipmapped = options.generate_mipmaps && pot;
        if options.generate_mipmaps && !pot {
            match ctx.npot_mipmaps() {
                NpotMipmaps::Reject => {
                    return Err(TextureError::NonPowerOfTwo { width, height });
                }
                NpotMipmaps::Downgrade => {
                    tracing::debug!(width, height, "npot texture; mipmaps disabled");
                }
            }
        }

        let gl = ctx.gl();
        let handle = gl.create_texture()?;
        gl.bind_texture_2d(Some(handle));
        gl.tex_image_2d_rgba8(width, height, pixels);
        if mipmapped {
            gl.generate_mipmap_2d();
            gl.tex_filters(MinFilter::LinearMipmapLinear, MagFilter::Linear);
        } else {
            gl.tex_filters(MinFilter::Linear, MagFilter::Linear);
            gl.tex_wrap(Wrap::ClampToEdge, Wrap::ClampToEdge);
        }
        gl.bind_texture_2d(None);

        Ok(Self {
            handle: Cell::new(Some(handle)),
            width,
            height,
        })
    }

    /// A 1×1 nearest-filtered texture of a single colour.
    pub fn solid(ctx: &RenderContext<G>, rgba: [u8; 4]) -> Result<Self, TextureError> {
        let gl = ctx.gl();
        let handle = gl.create_texture()?;
        gl.bind_texture_2d(Some(handle));
        gl.tex_image_2d_rgba8(1, 1, &rgba);
        gl.tex_filters(MinFilter::Nearest, MagFilter::Nearest);
        gl.bind_texture_2d(None);
        Ok(Self {
            handle: Cell::new(Some(handle)),
            width: 1,
            height: 1,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `None` once destroyed.
    pub fn handle(&self) -> Option<G::Texture> {
        self.handle.get()
    }

    pub fn bind(&self, ctx: &RenderContext<G>, unit: u32) {
        let gl = ctx.gl();
        gl.active_texture(unit);
        gl.bind_texture_2d(self.handle.get());
    }

    pub fn destroy(&self, ctx: &RenderContext<G>) {
        if let Some(handle) = self.handle.take() {
            ctx.gl().delete_texture(handle);
        }
    }
}
