pub mod acceleration;
pub mod extrema;
pub mod threshold;
