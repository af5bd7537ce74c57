pub mod test_binary;
pub mod test_shape;
