// ─── Faculty Launcher Core ───
// Headless engine: keeps a modpack instance in sync with the backend and
// launches it.
//
// Architecture:
//   core/
//     api/         Backend REST client (catalogue, manifests, login)
//     auth/        Session + dev identity profile
//     verify       SHA-256/SHA-1 content checks
//     retry        Exponential backoff on one endpoint
//     mirror/      Ordered mirror list with sticky failover
//     downloader/  Streaming transfers (.part + rename)
//     sync/        Batched modpack file synchronizer
//     java/        Runtime policy, probing and selection
//     version/     Version list + descriptors with inheritance
//     maven/       Coordinates + maven-metadata.xml
//     assets/      Asset index and objects
//     loaders/     Forge, NeoForge, Fabric, Quilt
//     install/     Staged install-and-launch pipeline
//     launch/      Classpath, natives, game process
//     events       Progress/log bus for the UI
//     launcher     Facade used by the desktop shell

pub mod api;
pub mod assets;
pub mod auth;
pub mod config;
pub mod downloader;
pub mod error;
pub mod events;
pub mod http;
pub mod install;
pub mod instance;
pub mod java;
pub mod launch;
pub mod launcher;
pub mod loaders;
pub mod maven;
pub mod mirror;
pub mod retry;
pub mod sync;
pub mod system;
pub mod verify;
pub mod version;
