// Core kernels: wire framing, quantization, columnar transforms, and error modeling.
pub mod display;
pub mod error;
pub mod frame;
pub mod materialize;
pub mod project;
pub mod quantize;
pub mod table;
pub mod value;
pub mod width;
