use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Android `KeyEvent` codes the bridge knows by name. Any other code can
/// still be sent through [`KeyCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum KeyCode {
    Home,
    Back,
    Call,
    EndCall,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    DpadCenter,
    VolumeUp,
    VolumeDown,
    Power,
    Camera,
    Tab,
    Space,
    Enter,
    Delete,
    Menu,
    Search,
    MediaPlayPause,
    MediaNext,
    MediaPrevious,
    Mute,
    VolumeMute,
    MediaStop,
    PageUp,
    PageDown,
    Escape,
    AppSwitch,
    Wakeup,
    Sleep,
    Other(u32),
}

impl KeyCode {
    pub fn code(&self) -> u32 {
        match self {
            KeyCode::Home => 3,
            KeyCode::Back => 4,
            KeyCode::Call => 5,
            KeyCode::EndCall => 6,
            KeyCode::DpadUp => 19,
            KeyCode::DpadDown => 20,
            KeyCode::DpadLeft => 21,
            KeyCode::DpadRight => 22,
            KeyCode::DpadCenter => 23,
            KeyCode::VolumeUp => 24,
            KeyCode::VolumeDown => 25,
            KeyCode::Power => 26,
            KeyCode::Camera => 27,
            KeyCode::Tab => 61,
            KeyCode::Space => 62,
            KeyCode::Enter => 66,
            KeyCode::Delete => 67,
            KeyCode::Menu => 82,
            KeyCode::Search => 84,
            KeyCode::MediaPlayPause => 85,
            KeyCode::MediaNext => 87,
            KeyCode::MediaPrevious => 88,
            KeyCode::Mute => 91,
            KeyCode::VolumeMute => 164,
            KeyCode::MediaStop => 86,
            KeyCode::PageUp => 92,
            KeyCode::PageDown => 93,
            KeyCode::Escape => 111,
            KeyCode::AppSwitch => 187,
            KeyCode::Wakeup => 224,
            KeyCode::Sleep => 223,
            KeyCode::Other(code) => *code,
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCode::Other(code) => write!(f, "{}", code),
            named => write!(f, "{:?}", named),
        }
    }
}

impl FromStr for KeyCode {
    type Err = String;

    /// Accepts a name (`home`, `KEYCODE_BACK`, `volume_up`) or a number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.trim().parse::<u32>() {
            return Ok(KeyCode::Other(code));
        }
        let name = s
            .trim()
            .to_ascii_lowercase()
            .trim_start_matches("keycode_")
            .replace(['_', '-'], "");
        let key = match name.as_str() {
            "home" => KeyCode::Home,
            "back" => KeyCode::Back,
            "call" => KeyCode::Call,
            "endcall" => KeyCode::EndCall,
            "up" | "dpadup" => KeyCode::DpadUp,
            "down" | "dpaddown" => KeyCode::DpadDown,
            "left" | "dpadleft" => KeyCode::DpadLeft,
            "right" | "dpadright" => KeyCode::DpadRight,
            "center" | "dpadcenter" => KeyCode::DpadCenter,
            "volumeup" => KeyCode::VolumeUp,
            "volumedown" => KeyCode::VolumeDown,
            "power" => KeyCode::Power,
            "camera" => KeyCode::Camera,
            "tab" => KeyCode::Tab,
            "space" => KeyCode::Space,
            "enter" => KeyCode::Enter,
            "del" | "delete" | "backspace" => KeyCode::Delete,
            "menu" => KeyCode::Menu,
            "search" => KeyCode::Search,
            "mediaplaypause" | "playpause" => KeyCode::MediaPlayPause,
            "medianext" | "next" => KeyCode::MediaNext,
            "mediaprevious" | "previous" => KeyCode::MediaPrevious,
            "mute" => KeyCode::Mute,
            "volumemute" => KeyCode::VolumeMute,
            "mediastop" | "stop" => KeyCode::MediaStop,
            "pageup" => KeyCode::PageUp,
            "pagedown" => KeyCode::PageDown,
            "escape" | "esc" => KeyCode::Escape,
            "appswitch" | "recents" => KeyCode::AppSwitch,
            "wakeup" => KeyCode::Wakeup,
            "sleep" => KeyCode::Sleep,
            _ => return Err(format!("unknown key {:?}", s)),
        };
        Ok(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}
