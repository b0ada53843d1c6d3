//! SPIR-V for the Plaster clay pipeline.
//!
//! The GLSL sources under `shaders/` are compiled by shaderc at build time.

use std::sync::OnceLock;

/// Embedded SPIR-V shader bytecode (raw bytes, may not be aligned).
mod spirv_bytes {
    pub static CLAY_VERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/clay.vert.spv"));
    pub static CLAY_FRAG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/clay.frag.spv"));
}

/// SPIR-V magic number, the first word of every module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Convert little-endian bytes to SPIR-V words. A trailing partial word is dropped.
fn bytes_to_spirv(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

static CLAY_VERT_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();
static CLAY_FRAG_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();

/// Clay vertex shader.
pub fn clay_vertex_shader() -> &'static [u32] {
    CLAY_VERT_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::CLAY_VERT))
}

/// Clay fragment shader.
pub fn clay_fragment_shader() -> &'static [u32] {
    CLAY_FRAG_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::CLAY_FRAG))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clay_shaders_load() {
        for shader in [clay_vertex_shader(), clay_fragment_shader()] {
            assert_eq!(shader[0], SPIRV_MAGIC, "Invalid SPIR-V magic number");
            assert!(shader.len() > 50, "Shader too small");
        }
    }

    #[test]
    fn partial_words_are_dropped() {
        assert_eq!(bytes_to_spirv(&[0x03, 0x02, 0x23, 0x07, 0xff]), [SPIRV_MAGIC]);
    }
}
