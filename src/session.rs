//! Keys under which the signed-in identity lives in the session store.

pub const USER_ID: &str = "user_id";
pub const USER_NAME: &str = "user_name";
