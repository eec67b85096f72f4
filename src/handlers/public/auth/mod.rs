// handlers/public/auth/mod.rs - Account lifecycle endpoints that do not require a token

pub mod login;    // POST /api/auth/login
pub mod password; // POST /api/auth/forgot-password, POST /api/auth/reset-password/:token
pub mod register; // POST /api/auth/register
pub mod verify;   // GET /api/auth/verify-email/:token, POST /api/auth/resend-verification

pub use login::login_post;
pub use password::{forgot_password_post, reset_password_post};
pub use register::register_post;
pub use verify::{resend_verification_post, verify_email_get};

/*
ACCOUNT FLOW:

1. **Register**: account created unverified with a 24h verification token; the email is
   best-effort and a delivery failure does not undo the registration.
2. **Verify**: the token is single-use; once consumed the account may log in.
3. **Login**: only verified accounts receive a session token (HS256, 7 days by default).
4. **Forgot / Reset**: a 1h single-use reset token; if the reset email cannot be delivered the
   token is withdrawn again so no unusable token lingers.
*/
