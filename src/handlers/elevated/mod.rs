// handlers/elevated/mod.rs - Elevated handlers (administrator role required)
//
// Security Level: JWT + global `administrator` role
// Route Prefix: /api/admin/*
// Middleware: jwt_auth_middleware → validate_user_middleware → require_admin

pub mod admin;

/*
ELEVATED HANDLER NOTES:

The administrator role is read from the freshly loaded user record on every request, so a
demoted administrator loses access immediately. Project-level roles play no part here.
*/
