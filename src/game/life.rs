pub const DEFAULT_MAX_HEALTH: u32 = 200;
pub const DEFAULT_INITIAL_HEALTH: u32 = 100;
pub const DEFAULT_MISS_PENALTY: u32 = 5;

/// Health bar bounded to `[0, max]`. Over- and underflow clamp silently.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Health {
    value: u32,
    max: u32,
}

impl Health {
    pub fn new(initial: u32, max: u32) -> Self {
        Self {
            value: initial.min(max),
            max,
        }
    }

    #[inline(always)]
    pub fn value(&self) -> u32 {
        self.value
    }

    #[inline(always)]
    pub fn max(&self) -> u32 {
        self.max
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.value == 0
    }

    pub fn ratio(&self) -> f32 {
        if self.max == 0 {
            return 0.0;
        }
        self.value as f32 / self.max as f32
    }

    pub fn gain(&mut self, amount: u32) {
        self.value = self.value.saturating_add(amount).min(self.max);
    }

    pub fn lose(&mut self, amount: u32) {
        self.value = self.value.saturating_sub(amount);
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_HEALTH, DEFAULT_MAX_HEALTH)
    }
}
