use std::path::{Path, PathBuf};

use log::info;

use crate::display::FONT;
use crate::error::RomError;
use crate::state::{FONT_ADDR, MEM_SIZE, PC_START_ADDR};

/// How the bytes of a ROM file map onto memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RomLayout {
    /// A program that is placed at the start address, under the font.
    Program,
    /// A full 4096-byte memory image copied verbatim.
    Image,
}

pub struct Rom {
    name: String,
    image: Box<[u8; MEM_SIZE]>,
}

impl Rom {
    pub fn from_path(path: &Path, layout: RomLayout) -> Result<Self, RomError> {
        let bytes = std::fs::read(path).map_err(|source| RomError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown ROM".to_string());

        let rom = Self::from_bytes(name, &bytes, layout).map_err(|e| e.at(path))?;
        info!("loaded {} ({} bytes, {layout:?})", rom.name, bytes.len());
        Ok(rom)
    }

    /// Builds the memory image for `bytes`. Errors carry an empty path.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: &[u8],
        layout: RomLayout,
    ) -> Result<Self, RomError> {
        let mut image = Box::new([0u8; MEM_SIZE]);
        match layout {
            RomLayout::Program => {
                let start = usize::from(PC_START_ADDR);
                if bytes.is_empty() {
                    return Err(RomError::Empty {
                        path: PathBuf::new(),
                    });
                }
                if bytes.len() > MEM_SIZE - start {
                    return Err(RomError::TooLarge {
                        path: PathBuf::new(),
                        size: bytes.len(),
                    });
                }
                let font_start = usize::from(FONT_ADDR);
                image[font_start..font_start + FONT.len()].copy_from_slice(&FONT);
                image[start..start + bytes.len()].copy_from_slice(bytes);
            }
            RomLayout::Image => {
                if bytes.len() != MEM_SIZE {
                    return Err(RomError::BadImageSize {
                        path: PathBuf::new(),
                        size: bytes.len(),
                    });
                }
                image.copy_from_slice(bytes);
            }
        }
        Ok(Rom {
            name: name.into(),
            image,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn memory_image(&self) -> &[u8; MEM_SIZE] {
        &self.image
    }
}

impl RomError {
    fn at(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            RomError::Io { source, .. } => RomError::Io { path, source },
            RomError::Empty { .. } => RomError::Empty { path },
            RomError::TooLarge { size, .. } => RomError::TooLarge { path, size },
            RomError::BadImageSize { size, .. } => RomError::BadImageSize { path, size },
        }
    }
}
