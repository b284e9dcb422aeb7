use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Active {
    Inactive,
    Active,
}

impl Active {
    pub fn value(self) -> u8 {
        match self {
            Self::Inactive => 0,
            Self::Active => 1,
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Inactive),
            1 => Some(Self::Active),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "INACTIVE",
            Self::Active => "ACTIVE",
        }
    }
}

/// `CoolAuto` and `Dry` only exist on the physical unit. The mode button walks
/// through them, so the confirmed state may sit on one while cycling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetMode {
    Auto,
    Heat,
    Cool,
    CoolAuto,
    Dry,
}

impl TargetMode {
    pub const ALL: [TargetMode; 5] = [
        Self::Auto,
        Self::Heat,
        Self::Cool,
        Self::CoolAuto,
        Self::Dry,
    ];

    pub fn value(self) -> u8 {
        match self {
            Self::Auto => 0,
            Self::Heat => 1,
            Self::Cool => 2,
            Self::CoolAuto => 3,
            Self::Dry => 4,
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Auto),
            1 => Some(Self::Heat),
            2 => Some(Self::Cool),
            3 => Some(Self::CoolAuto),
            4 => Some(Self::Dry),
            _ => None,
        }
    }

    pub fn is_user_selectable(self) -> bool {
        matches!(self, Self::Auto | Self::Heat | Self::Cool)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Heat => "HEAT",
            Self::Cool => "COOL",
            Self::CoolAuto => "COOL_AUTO",
            Self::Dry => "DRY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwingMode {
    Disabled,
    Enabled,
}

impl SwingMode {
    pub fn value(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::Enabled => 1,
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Disabled),
            1 => Some(Self::Enabled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "DISABLED",
            Self::Enabled => "ENABLED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrentMode {
    Inactive,
    Idle,
    Heating,
    Cooling,
}

impl CurrentMode {
    pub fn derive(active: Active, target_mode: TargetMode) -> Self {
        if active == Active::Inactive {
            return Self::Inactive;
        }

        match target_mode {
            TargetMode::Cool | TargetMode::CoolAuto => Self::Cooling,
            TargetMode::Heat => Self::Heating,
            TargetMode::Auto | TargetMode::Dry => Self::Idle,
        }
    }

    pub fn value(self) -> u8 {
        match self {
            Self::Inactive => 0,
            Self::Idle => 1,
            Self::Heating => 2,
            Self::Cooling => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "INACTIVE",
            Self::Idle => "IDLE",
            Self::Heating => "HEATING",
            Self::Cooling => "COOLING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub active: Active,
    #[serde(rename = "targetMode")]
    pub target_mode: TargetMode,
    #[serde(rename = "coolingThreshold")]
    pub cooling_threshold: u8,
    #[serde(rename = "heatingThreshold")]
    pub heating_threshold: u8,
    pub swing: SwingMode,
}

impl Configuration {
    pub fn current_mode(&self) -> CurrentMode {
        CurrentMode::derive(self.active, self.target_mode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Field {
    Active,
    TargetMode,
    CoolingThreshold,
    HeatingThreshold,
    Swing,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Self::Active,
        Self::TargetMode,
        Self::CoolingThreshold,
        Self::HeatingThreshold,
        Self::Swing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::TargetMode => "target_mode",
            Self::CoolingThreshold => "cooling_threshold",
            Self::HeatingThreshold => "heating_threshold",
            Self::Swing => "swing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    SwitchPower,
    SwitchMode,
    TemperatureUp,
    TemperatureDown,
    ToggleSwing,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessoryStatus {
    pub active: &'static str,
    #[serde(rename = "targetMode")]
    pub target_mode: &'static str,
    #[serde(rename = "currentMode")]
    pub current_mode: &'static str,
    #[serde(rename = "coolingThreshold")]
    pub cooling_threshold: u8,
    #[serde(rename = "heatingThreshold")]
    pub heating_threshold: u8,
    pub swing: &'static str,
    #[serde(rename = "currentTemp")]
    pub current_temp: Option<f32>,
    pub confirmed: Configuration,
    pub converging: bool,
    #[serde(rename = "commitPending")]
    pub commit_pending: bool,
    #[serde(rename = "sentFrames")]
    pub sent_frames: u64,
}
