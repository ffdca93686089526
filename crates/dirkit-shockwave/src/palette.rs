//! Color palettes for indexed bitmaps
//!
//! Palettes are registered explicitly on a [`PaletteRegistry`] that the
//! caller owns and passes to the bitmap decoder. Negative ids name the
//! built-in Director palettes; positive ids are cast members.

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt};
use serde::Deserialize;

use crate::error::{Result, ShockwaveError};

pub const PALETTE_SIZE: usize = 256;

/// Palettes shipped with Director, by their reserved ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinPalette {
    SystemMac,
    Rainbow,
    Grayscale,
    Pastels,
    Vivid,
    Ntsc,
    Metallic,
    SystemWin,
    SystemWinD5,
}

impl BuiltinPalette {
    pub const ALL: [BuiltinPalette; 9] = [
        BuiltinPalette::SystemMac,
        BuiltinPalette::Rainbow,
        BuiltinPalette::Grayscale,
        BuiltinPalette::Pastels,
        BuiltinPalette::Vivid,
        BuiltinPalette::Ntsc,
        BuiltinPalette::Metallic,
        BuiltinPalette::SystemWin,
        BuiltinPalette::SystemWinD5,
    ];

    pub fn id(self) -> i16 {
        match self {
            BuiltinPalette::SystemMac => -1,
            BuiltinPalette::Rainbow => -2,
            BuiltinPalette::Grayscale => -3,
            BuiltinPalette::Pastels => -4,
            BuiltinPalette::Vivid => -5,
            BuiltinPalette::Ntsc => -6,
            BuiltinPalette::Metallic => -7,
            BuiltinPalette::SystemWin => -101,
            BuiltinPalette::SystemWinD5 => -102,
        }
    }

    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    /// File name looked up by [`PaletteRegistry::load_dir`]
    pub fn file_name(self) -> &'static str {
        match self {
            BuiltinPalette::SystemMac => "SystemMac.json",
            BuiltinPalette::Rainbow => "Rainbow.json",
            BuiltinPalette::Grayscale => "Grayscale.json",
            BuiltinPalette::Pastels => "Pastels.json",
            BuiltinPalette::Vivid => "Vivid.json",
            BuiltinPalette::Ntsc => "NTSC.json",
            BuiltinPalette::Metallic => "Metallic.json",
            BuiltinPalette::SystemWin => "SystemWin.json",
            BuiltinPalette::SystemWinD5 => "SystemWinD5.json",
        }
    }
}

#[derive(Deserialize)]
struct JsonColor {
    #[serde(rename = "R")]
    r: u8,
    #[serde(rename = "G")]
    g: u8,
    #[serde(rename = "B")]
    b: u8,
}

/// 256-entry RGB table. Entries past `len` are black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [[u8; 3]; PALETTE_SIZE],
    len: usize,
}

impl Palette {
    pub fn from_colors(colors: &[[u8; 3]]) -> Result<Self> {
        if colors.len() > PALETTE_SIZE {
            return Err(ShockwaveError::InvalidPalette(format!(
                "{} colors, at most {} allowed",
                colors.len(),
                PALETTE_SIZE
            )));
        }
        let mut table = [[0u8; 3]; PALETTE_SIZE];
        table[..colors.len()].copy_from_slice(colors);
        Ok(Self {
            colors: table,
            len: colors.len(),
        })
    }

    /// Parse a JSON array of `{"R":..,"G":..,"B":..}` objects
    pub fn from_json(json: &str) -> Result<Self> {
        let colors: Vec<JsonColor> = serde_json::from_str(json)?;
        let colors: Vec<[u8; 3]> = colors.into_iter().map(|c| [c.r, c.g, c.b]).collect();
        Self::from_colors(&colors)
    }

    /// Parse a CLUT payload: u32 count, then 16-bit big-endian channels.
    /// Only the high byte of each channel is kept.
    pub fn from_clut(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let short = |e: std::io::Error| ShockwaveError::InvalidPalette(format!("CLUT: {}", e));

        let mut count = cursor.read_u32::<BigEndian>().map_err(short)? as usize;
        if count > PALETTE_SIZE {
            tracing::info!("CLUT declares {} colors, keeping {}", count, PALETTE_SIZE);
            count = PALETTE_SIZE;
        }
        let mut colors = Vec::with_capacity(count);
        for _ in 0..count {
            let r = cursor.read_u16::<BigEndian>().map_err(short)?;
            let g = cursor.read_u16::<BigEndian>().map_err(short)?;
            let b = cursor.read_u16::<BigEndian>().map_err(short)?;
            colors.push([(r >> 8) as u8, (g >> 8) as u8, (b >> 8) as u8]);
        }
        Self::from_colors(&colors)
    }

    /// Director's grayscale ramp, white at index 0
    pub fn grayscale() -> Self {
        let mut colors = [[0u8; 3]; PALETTE_SIZE];
        for (i, c) in colors.iter_mut().enumerate() {
            let v = 255 - i as u8;
            *c = [v, v, v];
        }
        Self {
            colors,
            len: PALETTE_SIZE,
        }
    }

    /// Number of colors the source defined
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: u8) -> [u8; 3] {
        self.colors[index as usize]
    }

    pub fn colors(&self) -> &[[u8; 3]; PALETTE_SIZE] {
        &self.colors
    }
}

/// Palettes available to one extraction session
#[derive(Debug, Clone, Default)]
pub struct PaletteRegistry {
    palettes: HashMap<i16, Palette>,
}

impl PaletteRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the palettes that need no data files
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(BuiltinPalette::Grayscale.id(), Palette::grayscale());
        registry
    }

    /// Add or replace a palette
    pub fn register(&mut self, id: i16, palette: Palette) {
        tracing::debug!("Registered palette {} ({} colors)", id, palette.len());
        self.palettes.insert(id, palette);
    }

    pub fn retrieve(&self, id: i16) -> Result<&Palette> {
        self.palettes
            .get(&id)
            .ok_or(ShockwaveError::PaletteNotFound(id))
    }

    pub fn contains(&self, id: i16) -> bool {
        self.palettes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }

    /// Load one JSON palette file
    pub fn load_json_file(&mut self, id: i16, path: &Path) -> Result<()> {
        let json = fs::read_to_string(path)?;
        self.register(id, Palette::from_json(&json)?);
        Ok(())
    }

    /// Load every built-in palette file present in `dir`; returns how many
    /// were found. Missing files are skipped.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut loaded = 0;
        for builtin in BuiltinPalette::ALL {
            let path = dir.join(builtin.file_name());
            if !path.is_file() {
                tracing::debug!("No {} in {}", builtin.file_name(), dir.display());
                continue;
            }
            self.load_json_file(builtin.id(), &path)?;
            loaded += 1;
        }
        tracing::info!("Loaded {} palettes from {}", loaded, dir.display());
        Ok(loaded)
    }
}
