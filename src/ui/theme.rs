use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub header_accent_bg: Color,
    pub header_accent_fg: Color,
    pub status_ok: Color,
    pub status_err: Color,
    pub status_warn: Color,
    pub statusbar_bg: Color,
    pub border: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub accent: Color,
    pub pill_key_bg: Color,
    pub pill_key_fg: Color,
    pub pill_desc_fg: Color,
    pub surface_bg: Color,
    pub gauge_unfilled: Color,
    pub selection_bg: Color,
    pub rx_color: Color,
    pub tx_color: Color,
    /// Idle, normal, warm, hot, critical.
    pub heat_colors: [Color; 5],
}

impl Theme {
    pub fn from_config(theme_name: &str) -> Self {
        match theme_name.to_lowercase().as_str() {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn next(&self) -> Self {
        match self.name {
            "dark" => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Colour for a 0..=100 load percentage.
    pub fn heat(&self, percent: f64) -> Color {
        let index = match percent {
            p if p < 10.0 => 0,
            p if p < 50.0 => 1,
            p if p < 75.0 => 2,
            p if p < 90.0 => 3,
            _ => 4,
        };
        self.heat_colors[index]
    }

    pub fn dark() -> Self {
        Theme {
            name: "dark",
            header_accent_bg: Color::Green,
            header_accent_fg: Color::Black,
            status_ok: Color::Green,
            status_err: Color::Red,
            status_warn: Color::Yellow,
            statusbar_bg: Color::DarkGray,
            border: Color::DarkGray,
            text_primary: Color::White,
            text_secondary: Color::Gray,
            accent: Color::Green,
            pill_key_bg: Color::Yellow,
            pill_key_fg: Color::Black,
            pill_desc_fg: Color::White,
            surface_bg: Color::DarkGray,
            gauge_unfilled: Color::DarkGray,
            selection_bg: Color::Rgb(55, 65, 81),
            rx_color: Color::Rgb(103, 232, 249),
            tx_color: Color::Rgb(251, 146, 60),
            heat_colors: [
                Color::Rgb(71, 85, 105),
                Color::Rgb(16, 185, 129),
                Color::Rgb(249, 115, 22),
                Color::Rgb(239, 68, 68),
                Color::Rgb(236, 72, 153),
            ],
        }
    }

    pub fn light() -> Self {
        Theme {
            name: "light",
            header_accent_bg: Color::Blue,
            header_accent_fg: Color::White,
            status_ok: Color::Rgb(0, 120, 0),
            status_err: Color::Red,
            status_warn: Color::Rgb(180, 120, 0),
            statusbar_bg: Color::Rgb(220, 220, 220),
            border: Color::Rgb(150, 150, 150),
            text_primary: Color::Black,
            text_secondary: Color::DarkGray,
            accent: Color::Blue,
            pill_key_bg: Color::Blue,
            pill_key_fg: Color::White,
            pill_desc_fg: Color::Black,
            surface_bg: Color::Rgb(200, 200, 200),
            gauge_unfilled: Color::Rgb(200, 200, 200),
            selection_bg: Color::Rgb(190, 210, 235),
            rx_color: Color::Rgb(70, 130, 180),
            tx_color: Color::Rgb(200, 100, 0),
            heat_colors: [
                Color::Rgb(180, 180, 180),
                Color::Rgb(100, 180, 100),
                Color::Rgb(220, 180, 50),
                Color::Rgb(220, 120, 80),
                Color::Rgb(200, 60, 60),
            ],
        }
    }
}
