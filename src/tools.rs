pub mod compiler;
pub mod descriptor;
pub mod error;
pub mod request;
pub mod schema;
pub mod traits;

pub use compiler::{CompiledTool, compile};
pub use descriptor::{HttpMethod, ParamModality, ToolDescriptor, ToolParameter};
