// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Route Prefix: /api/auth/*, plus the public project catalogue
// Middleware: None

pub mod auth;
pub mod projects;

/*
PUBLIC HANDLER NOTES:

1. **No User Context**: handlers never see an `AuthUser` or `CurrentUser`
2. **Input Validation**: every field is validated and all problems are reported together
3. **Enumeration**: login answers unknown email and wrong password identically
4. **Security Logging**: failed logins and token misuse are logged at `warn`
*/
