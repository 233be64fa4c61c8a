//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Simulation tick counter
pub type Tick = u64;

/// Index of a species in the species table (and of its population)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub usize);

/// Clan identifier, unique within its species
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClanId(pub u32);

/// Individual identifier, unique for one simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndividualId(pub u64);

/// Position of a clan in the engine: owning species and index in its clan list
///
/// Only valid until the clan lists change; rebuilt with the spatial index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClanKey {
    pub species: SpeciesId,
    pub index: usize,
}

/// How one species treats another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Relation {
    #[serde(alias = "Aggressiv")]
    Aggressive,
    #[serde(alias = "Freundlich")]
    Friendly,
    #[serde(alias = "Ängstlich")]
    Fearful,
    #[default]
    Neutral,
}

/// RGBA color with components in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const GRAY: Color = Color([0.5, 0.5, 0.5, 1.0]);

    /// Parse `#rrggbb` or `#rrggbbaa`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| -> Option<f32> {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        let alpha = if digits.len() == 8 { channel(6)? } else { 1.0 };
        Some(Self([channel(0)?, channel(2)?, channel(4)?, alpha]))
    }

    /// Accept 3 or 4 components, either 0..=1 floats or 0..=255 values
    pub fn from_components(values: &[f32]) -> Option<Self> {
        if values.len() != 3 && values.len() != 4 {
            return None;
        }
        let scale = if values.iter().any(|v| *v > 1.0) { 255.0 } else { 1.0 };
        let mut rgba = [1.0; 4];
        for (slot, v) in rgba.iter_mut().zip(values) {
            *slot = (v / scale).clamp(0.0, 1.0);
        }
        Some(Self(rgba))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::GRAY
    }
}

/// 2D position or velocity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn length_sq(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(&self) -> f32 {
        self.length_sq().sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0001 {
            Self { x: self.x / len, y: self.y / len }
        } else {
            Self::default()
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Unit vector for a heading in radians, scaled by `speed`
    pub fn from_angle(angle: f32, speed: f32) -> Self {
        Self { x: angle.cos() * speed, y: angle.sin() * speed }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}
