use serde::{Deserialize, Serialize};

const INIT_DIRECTIVE: &str = "%%{init:";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Dark,
    Forest,
    Neutral,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Dark => "dark",
            Theme::Forest => "forest",
            Theme::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Theme::Default),
            "dark" => Ok(Theme::Dark),
            "forest" => Ok(Theme::Forest),
            "neutral" => Ok(Theme::Neutral),
            other => Err(format!(
                "unknown theme '{other}' (expected default, dark, forest or neutral)"
            )),
        }
    }
}

/// Prepend an init directive selecting `theme`, unless the source already
/// carries one or the theme is the renderer's default.
pub fn inject_theme(source: &str, theme: Theme) -> String {
    if theme == Theme::Default || source.contains(INIT_DIRECTIVE) {
        return source.to_string();
    }
    format!(
        "{INIT_DIRECTIVE} {{\"theme\":\"{}\"}} }}%%\n{source}",
        theme.as_str()
    )
}
