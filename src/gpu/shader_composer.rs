use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage,
    ShaderType,
};

/// Shader programs built by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shader {
    /// Full-screen video quad sampling the camera texture.
    Passthrough,
}

impl Shader {
    fn source(self) -> &'static str {
        match self {
            Self::Passthrough => {
                include_str!("../../assets/shaders/screen/passthrough.wgsl")
            }
        }
    }

    fn file_path(self) -> &'static str {
        match self {
            Self::Passthrough => "screen/passthrough.wgsl",
        }
    }

    /// Debug label for GPU objects built from this shader.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passthrough => "Passthrough",
        }
    }
}

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Shared WGSL modules are registered at construction time; consuming
/// shaders pull them in with `#import arpass::module_name`. Composition
/// produces `naga::Module` IR directly, so failures surface here as
/// readable diagnostics instead of at pipeline creation.
pub struct ShaderComposer {
    composer: Composer,
}

impl ShaderComposer {
    /// Create a composer with all shared modules registered.
    ///
    /// # Errors
    ///
    /// Returns the composer diagnostics if a shared module fails to parse.
    pub fn new() -> Result<Self, String> {
        let mut composer = Composer::default();

        // Registered in dependency order.
        let modules: &[(&str, &str)] = &[(
            include_str!("../../assets/shaders/modules/quad.wgsl"),
            "modules/quad.wgsl",
        )];

        for &(source, file_path) in modules {
            if let Err(e) =
                composer.add_composable_module(ComposableModuleDescriptor {
                    source,
                    file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
            {
                return Err(e.emit_to_string(&composer));
            }
        }

        Ok(Self { composer })
    }

    /// Compose `shader` into a `wgpu::ShaderModule` ready for pipeline
    /// creation.
    ///
    /// # Errors
    ///
    /// Returns the composer diagnostics if composition or validation fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        shader: Shader,
    ) -> Result<wgpu::ShaderModule, String> {
        let naga_module = self.compose_naga(shader)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.label()),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose `shader` into a `naga::Module` without creating a wgpu
    /// shader module. Useful for testing shader composition without a GPU
    /// device.
    ///
    /// # Errors
    ///
    /// Returns the composer diagnostics if composition or validation fails.
    pub fn compose_naga(
        &mut self,
        shader: Shader,
    ) -> Result<naga::Module, String> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source: shader.source(),
                file_path: shader.file_path(),
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| e.emit_to_string(&self.composer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_composes() {
        let mut composer = ShaderComposer::new().unwrap();
        let module = composer
            .compose_naga(Shader::Passthrough)
            .unwrap_or_else(|e| panic!("passthrough failed to compose: {e}"));
        let entry_points: Vec<&str> =
            module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
        assert!(entry_points.contains(&"vs_main"));
        assert!(entry_points.contains(&"fs_main"));
    }

    #[test]
    fn passthrough_validates() {
        let mut composer = ShaderComposer::new().unwrap();
        let module = composer.compose_naga(Shader::Passthrough).unwrap();
        let _ = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .unwrap();
    }
}
