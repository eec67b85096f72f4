// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (bearer token, user reloaded per request) → Elevated (administrator)
//
// Project and document routes inside the protected tier additionally require a verified email.
pub mod public;    // Tier 1: /api/auth/*, /api/projects/public
pub mod protected; // Tier 2: /api/user/*, /api/projects/*, /api/documents/*, /api/forums/*
pub mod elevated;  // Tier 3: /api/admin/*

pub mod files;
pub mod utils;

/*
HANDLER LAYOUT:

src/handlers/
├── mod.rs                 ← This file
├── utils.rs               ← Aggregate loaders, id/enum/tag parsing shared by every tier
├── files.rs               ← Multipart file parts to storage, stored files back as downloads
├── public/
│   ├── auth/              ← register, verify-email, resend, login, forgot/reset password
│   └── projects.rs        ← GET /api/projects/public
├── protected/
│   ├── user.rs            ← profile, dashboard, check-status
│   ├── projects/          ← create, list, show, update, members, join
│   ├── documents/         ← upload, list, show, download, update, permissions, delete, restore
│   └── forums/            ← forums, discussions, replies
└── elevated/
    └── admin.rs           ← user listing and statistics

Every handler returns `ApiResult<T>`: success bodies go through the `{success, message?, data?}`
envelope, failures through `ApiError`. Authorization decisions are made by the functions in
`crate::access`; handlers only load aggregates and map the outcome.
*/
