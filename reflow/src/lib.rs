mod compose;
mod overlap;
mod poll;
mod produce;
mod registry;
mod resource;
mod source;
mod state;
mod stream_ext;

pub use compose::*;
pub use overlap::*;
pub use poll::*;
pub use produce::*;
pub use registry::*;
pub use resource::*;
pub use source::*;
pub use state::*;
pub use stream_ext::*;
