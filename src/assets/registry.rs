use std::collections::HashMap;
use std::path::PathBuf;

use crate::assets::bitmap::Bitmap;
use crate::assets::decode::decode_image_file;
use crate::assets::source::{Source, SourceContent, TextRasterizer};
use crate::foundation::error::{EvaError, EvaResult};
use crate::gpu::handles::TextureId;
use crate::gpu::platform::GpuCommands;
use crate::gpu::surface_manager::CurrentContext;
use crate::scene::model::SceneDescriptor;

/// Decoded frame of the backing video.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Opaque RGBA8 pixels of the whole packed frame.
    pub pixels: Bitmap,
    /// Decoder presentation time, if known.
    pub pts_ns: Option<u64>,
}

/// Uploaded backing video frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoTexture {
    /// Texture holding the whole frame.
    pub texture: TextureId,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

/// Arena of sources keyed by id, plus the backing video slot.
///
/// Textures are uploaded lazily on first use and live in the share group of whichever context
/// was current at upload time, so a texture uploaded under the display context is drawable from
/// the encoder context without another upload.
pub struct SourceRegistry {
    sources: Vec<Source>,
    idx_by_id: HashMap<String, usize>,
    video: Option<VideoFrame>,
    video_texture: TextureId,
    video_dirty: bool,
    rasterizer: Option<Box<dyn TextRasterizer + Send>>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.sources.len())
            .field("video", &self.video.is_some())
            .field("video_texture", &self.video_texture)
            .field("rasterizer", &self.rasterizer.is_some())
            .finish()
    }
}

impl SourceRegistry {
    /// One empty source per descriptor source spec.
    pub fn from_descriptor(descriptor: &SceneDescriptor) -> EvaResult<Self> {
        let sources = descriptor
            .sources()
            .iter()
            .map(Source::from_spec)
            .collect::<EvaResult<Vec<_>>>()?;
        let idx_by_id = sources
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Ok(Self {
            sources,
            idx_by_id,
            video: None,
            video_texture: TextureId::NONE,
            video_dirty: false,
            rasterizer: None,
        })
    }

    /// Install the text rasterizer used for text sources.
    pub fn set_rasterizer(&mut self, rasterizer: Box<dyn TextRasterizer + Send>) {
        self.rasterizer = Some(rasterizer);
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// `true` when the descriptor declared no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Look up a source.
    pub fn get(&self, id: &str) -> Option<&Source> {
        self.idx_by_id.get(id).map(|&i| &self.sources[i])
    }

    fn get_mut(&mut self, id: &str) -> EvaResult<&mut Source> {
        match self.idx_by_id.get(id) {
            Some(&i) => Ok(&mut self.sources[i]),
            None => Err(EvaError::validation(format!("unknown source '{id}'"))),
        }
    }

    /// Hand decoded pixels to an image source. They replace any earlier pixels and mark the
    /// texture for re-upload.
    pub fn attach_bitmap(&mut self, id: &str, pixels: Bitmap) -> EvaResult<()> {
        let src = self.get_mut(id)?;
        match &mut src.content {
            SourceContent::Image(image) => {
                image.pixels = Some(pixels);
                src.dirty = true;
                Ok(())
            }
            SourceContent::Text(_) => Err(EvaError::validation(format!(
                "source '{id}' is a text source"
            ))),
        }
    }

    /// Record where an image source's pixels were saved, for reloads after upload.
    pub fn set_persisted_path(&mut self, id: &str, path: impl Into<PathBuf>) -> EvaResult<()> {
        let src = self.get_mut(id)?;
        match &mut src.content {
            SourceContent::Image(image) => {
                image.persisted_path = Some(path.into());
                Ok(())
            }
            SourceContent::Text(_) => Err(EvaError::validation(format!(
                "source '{id}' is a text source"
            ))),
        }
    }

    /// Replace the text of a text source. Unchanged text keeps the current texture.
    pub fn set_text(&mut self, id: &str, text: &str) -> EvaResult<()> {
        let src = self.get_mut(id)?;
        match &mut src.content {
            SourceContent::Text(content) => {
                if content.text != text {
                    content.text = text.to_string();
                    src.dirty = true;
                }
                Ok(())
            }
            SourceContent::Image(_) => Err(EvaError::validation(format!(
                "source '{id}' is an image source"
            ))),
        }
    }

    /// Store the latest decoded video frame; it is uploaded on the next draw.
    pub fn set_video_frame(&mut self, frame: VideoFrame) {
        self.video = Some(frame);
        self.video_dirty = true;
    }

    /// Latest video frame, if any.
    pub fn video_frame(&self) -> Option<&VideoFrame> {
        self.video.as_ref()
    }

    /// Texture for `id`, uploading under `ctx` when missing or stale.
    ///
    /// Image pixels are released after a successful upload; a later re-upload decodes from the
    /// persisted path. Every failure is a [`EvaError::SourceResolutionFailed`].
    pub fn resolve_texture<G: GpuCommands + ?Sized>(
        &mut self,
        gpu: &mut G,
        ctx: &CurrentContext,
        id: &str,
    ) -> EvaResult<TextureId> {
        let idx = *self
            .idx_by_id
            .get(id)
            .ok_or_else(|| EvaError::source_resolution(id, "unknown source"))?;
        let src = &mut self.sources[idx];
        if src.is_resident() {
            return Ok(src.texture);
        }

        let (pixels, from_memory) = match &mut src.content {
            SourceContent::Image(image) => match (image.pixels.take(), &image.persisted_path) {
                (Some(pixels), _) => (pixels, true),
                (None, Some(path)) => (
                    decode_image_file(path)
                        .map_err(|err| EvaError::source_resolution(id, err.to_string()))?,
                    false,
                ),
                (None, None) => {
                    return Err(EvaError::source_resolution(id, "no bitmap attached"));
                }
            },
            SourceContent::Text(text) => {
                let rasterizer = self
                    .rasterizer
                    .as_mut()
                    .ok_or_else(|| EvaError::source_resolution(id, "no text rasterizer"))?;
                let pixels = rasterizer
                    .rasterize(text, src.width, src.height)
                    .map_err(|err| EvaError::source_resolution(id, err.to_string()))?;
                (pixels, false)
            }
        };

        let uploaded = if src.texture.is_set() {
            gpu.update_texture(ctx.context(), src.texture, &pixels)
                .map(|()| src.texture)
        } else {
            gpu.create_texture(ctx.context(), &pixels)
        };
        match uploaded {
            Ok(texture) => {
                src.texture = texture;
                src.dirty = false;
                tracing::debug!(source = id, ?texture, "source uploaded");
                Ok(texture)
            }
            Err(err) => {
                if from_memory && let SourceContent::Image(image) = &mut src.content {
                    image.pixels = Some(pixels);
                }
                Err(EvaError::source_resolution(id, format!("upload failed: {err}")))
            }
        }
    }

    /// Texture of the current video frame, uploading it when a new frame arrived.
    pub fn resolve_video_texture<G: GpuCommands + ?Sized>(
        &mut self,
        gpu: &mut G,
        ctx: &CurrentContext,
    ) -> EvaResult<Option<VideoTexture>> {
        let Some(frame) = &self.video else {
            return Ok(None);
        };
        if self.video_dirty || !self.video_texture.is_set() {
            let uploaded = if self.video_texture.is_set() {
                gpu.update_texture(ctx.context(), self.video_texture, &frame.pixels)
                    .map(|()| self.video_texture)
            } else {
                gpu.create_texture(ctx.context(), &frame.pixels)
            };
            self.video_texture = uploaded.map_err(|err| {
                EvaError::source_resolution("video", format!("upload failed: {err}"))
            })?;
            self.video_dirty = false;
        }
        Ok(Some(VideoTexture {
            texture: self.video_texture,
            width: frame.pixels.width(),
            height: frame.pixels.height(),
        }))
    }

    /// Forget one source's texture name after the platform stopped recognizing it.
    pub fn forget_texture(&mut self, id: &str) -> EvaResult<()> {
        self.get_mut(id)?.texture = TextureId::NONE;
        Ok(())
    }

    /// Forget the video frame's texture name; the retained frame is uploaded again.
    pub fn forget_video_texture(&mut self) {
        self.video_texture = TextureId::NONE;
    }

    /// Forget every texture name after the GPU objects were lost. Nothing is deleted.
    pub fn invalidate_textures(&mut self) {
        for src in &mut self.sources {
            src.texture = TextureId::NONE;
        }
        self.video_texture = TextureId::NONE;
    }

    /// Delete one source's texture; the next draw re-uploads it.
    pub fn evict<G: GpuCommands + ?Sized>(
        &mut self,
        gpu: &mut G,
        ctx: &CurrentContext,
        id: &str,
    ) -> EvaResult<()> {
        let src = self.get_mut(id)?;
        let texture = std::mem::take(&mut src.texture);
        if texture.is_set() {
            gpu.delete_texture(ctx.context(), texture)
                .map_err(|err| EvaError::gpu(format!("delete texture of '{id}': {err}")))?;
        }
        Ok(())
    }

    /// Delete every texture, logging failures. Used before the contexts go away.
    pub fn release_textures<G: GpuCommands + ?Sized>(
        &mut self,
        gpu: &mut G,
        ctx: &CurrentContext,
    ) {
        let textures = self
            .sources
            .iter_mut()
            .map(|s| std::mem::take(&mut s.texture))
            .chain(std::iter::once(std::mem::take(&mut self.video_texture)))
            .filter(|t| t.is_set())
            .collect::<Vec<_>>();
        for texture in textures {
            if let Err(err) = gpu.delete_texture(ctx.context(), texture) {
                tracing::warn!(?texture, %err, "texture delete failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/registry.rs"]
mod tests;
