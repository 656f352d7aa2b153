/// ħc [GeV fm].
pub const HBARC: f64 = 0.197_327_053;

/// Numerical floor below which a quantity is treated as zero.
pub const REALLY_SMALL: f64 = 1.0e-6;

/// Resonances narrower than this [GeV] count as stable.
pub const WIDTH_CUTOFF: f64 = 1.0e-5;
