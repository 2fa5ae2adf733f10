mod wait_group;

pub use self::wait_group::*;
