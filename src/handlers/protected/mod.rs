// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Security Level: JWT Authentication Required
// Route Prefix: /api/user/*, /api/projects/*, /api/documents/*, /api/forums/*
// Middleware: jwt_auth_middleware → validate_user_middleware (→ require_verified_email for
//             project and document routes)

pub mod documents;
pub mod forums;
pub mod projects;
pub mod user;

/*
HANDLER CONTEXT:

Handlers receive `Extension<CurrentUser>`, the caller's record re-read from the store on this
request. Nothing about the caller's permissions is cached in the token: a membership granted
or removed a second ago is already in effect.

Capability checks go through `crate::access`:
- project capabilities: `has_capability` (creator → member flag → public view fallback)
- document reads: document ACL `view` OR project `canViewDocuments`
- forum writes: project member or creator
*/
