/// Describes one scalar effect parameter to a UI or automation layer.
pub trait ParamInfo {
    fn name(&self) -> &str;

    fn display_name(&self) -> &str {
        self.name()
    }

    fn default_value(&self) -> f32;

    fn min(&self) -> f32 {
        0.0
    }

    fn max(&self) -> f32 {
        1.0
    }

    /// Clamp `value` into `[min, max]`.
    fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min(), self.max())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleParamInfo {
    pub name: String,
    pub default: Option<f32>,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub display_name: Option<String>,
}

impl SimpleParamInfo {
    pub fn new(name: impl Into<String>, default: f32) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
            min: None,
            max: None,
            display_name: None,
        }
    }

    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

impl ParamInfo for SimpleParamInfo {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    fn default_value(&self) -> f32 {
        self.default.unwrap_or(0.0)
    }

    fn min(&self) -> f32 {
        self.min.unwrap_or(0.0)
    }

    fn max(&self) -> f32 {
        self.max.unwrap_or(1.0)
    }
}
