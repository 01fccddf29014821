/// Year after which generation stops, whatever the rule says.
pub const DEFAULT_MAX_YEAR: i32 = 9999;

/// Expansion limits shared by every generator a set builds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Safety horizon. A rule whose selectors can never match (February 30th)
    /// keeps advancing until its period passes this year, then ends.
    pub max_year: i32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_year: DEFAULT_MAX_YEAR,
        }
    }
}

impl Config {
    pub fn with_max_year(mut self, max_year: i32) -> Self {
        self.max_year = max_year;
        self
    }
}
