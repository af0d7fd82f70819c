pub mod filesystem;

pub use filesystem::{
    create_filesystem_tools, EditFileTool, LsTool, ReadFileTool, WriteFileTool,
};
