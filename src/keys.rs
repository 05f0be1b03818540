//! Keys used in the device-local store

/// Cart line items
pub const CART: &str = "cart";

/// Cart written by older app versions; migrated into [`CART`] on load
pub const LEGACY_CART: &str = "carrinho";

/// Last fetched order list
pub const ORDERS: &str = "orders";

/// Logged-in user's profile
pub const USER: &str = "user";

/// Logged-in user's bearer token, stored as a bare string
pub const USER_TOKEN: &str = "userToken";

/// Admin bearer token, stored as a bare string
pub const ADMIN_TOKEN: &str = "admin_token";

/// Admin profile
pub const ADMIN_DATA: &str = "admin_data";

/// `light` or `dark`, stored as a bare string
pub const THEME: &str = "theme";

/// Favorites cache plus changes not yet confirmed by the server
pub const FAVORITES: &str = "favorites";
