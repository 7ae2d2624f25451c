use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage,
    ShaderType,
};

use crate::error::ViewerError;

/// Every top-level shader the renderer builds a pipeline from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shader {
    /// Instanced capsule cells (opaque pass).
    Cell,
    /// Ground grid line quads (opaque pass).
    Grid,
    /// Overlay spheres, peeled one layer per draw.
    Shape,
    /// Under-composite of one image into the accumulation target.
    Composite,
    /// Under-composite of one peel layer with the volumetric field.
    CompositeVolume,
    /// Accumulation target onto the surface.
    Present,
}

impl Shader {
    /// All shaders, in pipeline-construction order.
    pub const ALL: [Self; 6] = [
        Self::Cell,
        Self::Grid,
        Self::Shape,
        Self::Composite,
        Self::CompositeVolume,
        Self::Present,
    ];

    /// WGSL source, compiled into the binary.
    #[must_use]
    pub fn source(self) -> &'static str {
        match self {
            Self::Cell => include_str!("../../assets/shaders/raster/cell.wgsl"),
            Self::Grid => include_str!("../../assets/shaders/raster/grid.wgsl"),
            Self::Shape => include_str!("../../assets/shaders/raster/shape.wgsl"),
            Self::Composite => {
                include_str!("../../assets/shaders/screen/composite.wgsl")
            }
            Self::CompositeVolume => {
                include_str!("../../assets/shaders/screen/composite_volume.wgsl")
            }
            Self::Present => include_str!("../../assets/shaders/screen/present.wgsl"),
        }
    }

    /// Path reported in composer diagnostics.
    #[must_use]
    pub fn file_path(self) -> &'static str {
        match self {
            Self::Cell => "raster/cell.wgsl",
            Self::Grid => "raster/grid.wgsl",
            Self::Shape => "raster/shape.wgsl",
            Self::Composite => "screen/composite.wgsl",
            Self::CompositeVolume => "screen/composite_volume.wgsl",
            Self::Present => "screen/present.wgsl",
        }
    }
}

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Pre-loads all shared WGSL modules at construction time. Consuming
/// shaders use `#import cellview::module_name` to pull in shared code. The
/// composer produces `naga::Module` IR directly, which is validated before
/// it reaches wgpu so a broken shader is an error value, not a device
/// panic.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition.
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

impl ShaderComposer {
    /// Composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// [`ViewerError::ShaderBuild`] if a shared module fails to parse.
    pub fn new() -> Result<Self, ViewerError> {
        let mut composer = Composer::default();

        // Dependency order: modules that import others come last.
        let modules: &[ModuleDef] = &[
            ModuleDef {
                source: include_str!("../../assets/shaders/modules/fullscreen.wgsl"),
                file_path: "modules/fullscreen.wgsl",
            },
            ModuleDef {
                source: include_str!("../../assets/shaders/modules/camera.wgsl"),
                file_path: "modules/camera.wgsl",
            },
            ModuleDef {
                source: include_str!("../../assets/shaders/modules/shading.wgsl"),
                file_path: "modules/shading.wgsl",
            },
        ];

        for m in modules {
            let added = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map(|_| ());
            if let Err(e) = added {
                return Err(ViewerError::ShaderBuild {
                    label: m.file_path.to_owned(),
                    message: e.emit_to_string(&composer),
                });
            }
        }

        Ok(Self { composer })
    }

    /// Compose and validate `shader` into a `wgpu::ShaderModule`.
    ///
    /// # Errors
    ///
    /// [`ViewerError::ShaderBuild`] if composition or validation fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        shader: Shader,
    ) -> Result<wgpu::ShaderModule, ViewerError> {
        let module = self.compose_naga(shader)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.file_path()),
            source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
        }))
    }

    /// Compose and validate `shader` into a `naga::Module` without a GPU
    /// device.
    ///
    /// # Errors
    ///
    /// [`ViewerError::ShaderBuild`] if composition or validation fails.
    pub fn compose_naga(
        &mut self,
        shader: Shader,
    ) -> Result<naga::Module, ViewerError> {
        let module = self
            .composer
            .make_naga_module(NagaModuleDescriptor {
                source: shader.source(),
                file_path: shader.file_path(),
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| ViewerError::ShaderBuild {
                label: shader.file_path().to_owned(),
                message: e.emit_to_string(&self.composer),
            })?;

        let _ = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .map_err(|e| ViewerError::ShaderBuild {
            label: shader.file_path().to_owned(),
            message: e.as_inner().to_string(),
        })?;

        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_shaders_compose_and_validate() {
        let mut composer = ShaderComposer::new().unwrap();
        for shader in Shader::ALL {
            if let Err(e) = composer.compose_naga(shader) {
                panic!("{e}");
            }
        }
    }

    #[test]
    fn entry_points_match_pipelines() {
        let mut composer = ShaderComposer::new().unwrap();
        let mut entries = |shader: Shader| -> Vec<String> {
            composer
                .compose_naga(shader)
                .unwrap()
                .entry_points
                .iter()
                .map(|ep| ep.name.clone())
                .collect()
        };
        let volume = entries(Shader::CompositeVolume);
        for name in ["vs_main", "fs_layer", "fs_final"] {
            assert!(volume.iter().any(|e| e == name), "missing {name}");
        }
        let shape = entries(Shader::Shape);
        for name in ["vs_main", "fs_main", "fs_final"] {
            assert!(shape.iter().any(|e| e == name), "missing {name}");
        }
        let present = entries(Shader::Present);
        for name in ["vs_main", "fs_main", "fs_srgb"] {
            assert!(present.iter().any(|e| e == name), "missing {name}");
        }
    }
}
