pub mod auth;
pub mod comments;
pub mod config;
pub mod data;
pub mod estimate;
pub mod loyalty;
pub mod repair;
pub mod system;

use crate::cli::registry::CommandRegistry;

pub fn register_all(registry: &mut CommandRegistry) {
    let groups = [
        auth::definitions(),
        repair::definitions(),
        comments::definitions(),
        loyalty::definitions(),
        estimate::definitions(),
        config::definitions(),
        data::definitions(),
        system::definitions(),
    ];
    for entry in groups.into_iter().flatten() {
        registry.register(entry);
    }
}
