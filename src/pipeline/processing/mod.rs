// Pipeline processing: field normalization and record assembly

pub mod assemble;
pub mod normalize;
