//! Material definitions
//!
//! Materials are a tagged variant over the classic (unlit-style) and
//! physically-based workflows, plus a fixed set of texture slots. The
//! deduplication pass compares materials field by field, so parameters
//! live in plain structs rather than behind shader abstractions.

use crate::foundation::math::Vec3;
use crate::foundation::collections::TypedHandle;
use crate::scene::texture::TextureHandle;

/// Typed handle to a material stored in the scene graph
pub type MaterialHandle = TypedHandle<Material>;

/// Parameters for the classic diffuse/specular workflow
#[derive(Debug, Clone, PartialEq)]
pub struct StandardMaterialParams {
    /// Diffuse color - RGB values
    pub diffuse_color: Vec3,
    /// Specular color - RGB values
    pub specular_color: Vec3,
    /// Emissive color for self-illuminated surfaces
    pub emissive_color: Vec3,
    /// Alpha transparency value
    pub alpha: f32,
}

impl Default for StandardMaterialParams {
    fn default() -> Self {
        Self {
            diffuse_color: Vec3::new(1.0, 1.0, 1.0),
            specular_color: Vec3::new(1.0, 1.0, 1.0),
            emissive_color: Vec3::new(0.0, 0.0, 0.0),
            alpha: 1.0,
        }
    }
}

/// Parameters for the metallic/roughness PBR workflow
#[derive(Debug, Clone, PartialEq)]
pub struct PbrMaterialParams {
    /// Base color (albedo) - RGB values
    pub base_color: Vec3,
    /// Metallic factor (0.0 = dielectric, 1.0 = metallic)
    pub metallic: f32,
    /// Roughness factor (0.0 = mirror, 1.0 = completely rough)
    pub roughness: f32,
    /// Alpha transparency value
    pub alpha: f32,
}

impl Default for PbrMaterialParams {
    fn default() -> Self {
        Self {
            base_color: Vec3::new(0.8, 0.8, 0.8),
            metallic: 0.0,
            roughness: 0.5,
            alpha: 1.0,
        }
    }
}

/// Enumeration of supported material variants
///
/// Variant membership participates in every comparison the optimizer makes:
/// materials of different variants are never considered similar.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Classic diffuse/specular material
    Standard(StandardMaterialParams),
    /// Physically-based metallic/roughness material
    Pbr(PbrMaterialParams),
}

impl MaterialKind {
    /// Short variant name used in statistics and log output
    pub fn variant_name(&self) -> &'static str {
        match self {
            MaterialKind::Standard(_) => "standard",
            MaterialKind::Pbr(_) => "pbr",
        }
    }
}

/// Texture bindings for a material
///
/// All slots are optional; each variant uses the slots relevant to its
/// workflow, but comparisons always walk the full slot set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialTextures {
    /// Diffuse color texture (standard workflow)
    pub diffuse: Option<TextureHandle>,
    /// Specular color texture (standard workflow)
    pub specular: Option<TextureHandle>,
    /// Emissive texture
    pub emissive: Option<TextureHandle>,
    /// Tangent-space normal map
    pub normal: Option<TextureHandle>,
    /// Base color (albedo) texture (PBR workflow)
    pub base_color: Option<TextureHandle>,
    /// Packed metallic/roughness texture (PBR workflow)
    pub metallic_roughness: Option<TextureHandle>,
    /// Ambient occlusion texture (PBR workflow)
    pub occlusion: Option<TextureHandle>,
}

impl MaterialTextures {
    /// Number of texture slots on every material
    pub const SLOT_COUNT: usize = 7;

    /// Create an empty slot set
    pub fn new() -> Self {
        Self::default()
    }

    /// All slots in a fixed order, for pairwise comparison
    pub fn slots(&self) -> [Option<TextureHandle>; Self::SLOT_COUNT] {
        [
            self.diffuse,
            self.specular,
            self.emissive,
            self.normal,
            self.base_color,
            self.metallic_roughness,
            self.occlusion,
        ]
    }

    /// Iterator over the slots that are bound
    pub fn bound(&self) -> impl Iterator<Item = TextureHandle> {
        self.slots().into_iter().flatten()
    }
}

/// Material resource combining a variant and its texture bindings
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Display name for diagnostics
    pub name: String,
    /// Material variant and parameters
    pub kind: MaterialKind,
    /// Texture bindings for this material
    pub textures: MaterialTextures,
}

impl Material {
    /// Create a new classic diffuse/specular material
    pub fn standard(params: StandardMaterialParams) -> Self {
        Self {
            name: String::from("standard material"),
            kind: MaterialKind::Standard(params),
            textures: MaterialTextures::new(),
        }
    }

    /// Create a new physically-based material
    pub fn pbr(params: PbrMaterialParams) -> Self {
        Self {
            name: String::from("pbr material"),
            kind: MaterialKind::Pbr(params),
            textures: MaterialTextures::new(),
        }
    }

    /// Set the material name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach a diffuse texture
    pub fn with_diffuse_texture(mut self, texture: TextureHandle) -> Self {
        self.textures.diffuse = Some(texture);
        self
    }

    /// Attach a specular texture
    pub fn with_specular_texture(mut self, texture: TextureHandle) -> Self {
        self.textures.specular = Some(texture);
        self
    }

    /// Attach an emissive texture
    pub fn with_emissive_texture(mut self, texture: TextureHandle) -> Self {
        self.textures.emissive = Some(texture);
        self
    }

    /// Attach a normal map
    pub fn with_normal_texture(mut self, texture: TextureHandle) -> Self {
        self.textures.normal = Some(texture);
        self
    }

    /// Attach a base color texture
    pub fn with_base_color_texture(mut self, texture: TextureHandle) -> Self {
        self.textures.base_color = Some(texture);
        self
    }

    /// Attach a packed metallic/roughness texture
    pub fn with_metallic_roughness_texture(mut self, texture: TextureHandle) -> Self {
        self.textures.metallic_roughness = Some(texture);
        self
    }

    /// Attach an ambient occlusion texture
    pub fn with_occlusion_texture(mut self, texture: TextureHandle) -> Self {
        self.textures.occlusion = Some(texture);
        self
    }
}
