pub mod guild_lifecycle;
