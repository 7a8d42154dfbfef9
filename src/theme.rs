/// Accent color used for terminal banners, as an RGB tuple for anstyle
pub const ACCENT_RGB: (u8, u8, u8) = (207, 106, 76);
