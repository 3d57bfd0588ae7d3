use std::collections::HashMap;

use once_cell::sync::Lazy;

pub const DEFAULT_LOCALE: &str = "en";

pub mod keys {
    pub const UNKNOWN_COMMAND: &str = "UNKNOWN_COMMAND";
    pub const DENIED_OWNER_ONLY: &str = "DENIED_OWNER_ONLY";
    pub const DENIED_GUILD_ONLY: &str = "DENIED_GUILD_ONLY";
    pub const DENIED_NSFW_ONLY: &str = "DENIED_NSFW_ONLY";
    pub const DENIED_PERMISSION: &str = "DENIED_PERMISSION";
    pub const DENIED_DISABLED: &str = "DENIED_DISABLED";
    pub const THROTTLED: &str = "THROTTLED";
    pub const COMMAND_ERROR: &str = "COMMAND_ERROR";
    pub const COMMAND_ERROR_REPORT: &str = "COMMAND_ERROR_REPORT";

    pub const PROMPT_INVALID_ARG: &str = "PROMPT_INVALID_ARG";
    pub const PROMPT_CANCEL: &str = "PROMPT_CANCEL";
    pub const PROMPT_CANCELLED: &str = "PROMPT_CANCELLED";
    pub const PROMPT_TIMED_OUT: &str = "PROMPT_TIMED_OUT";
    pub const PROMPT_TOO_MANY_ATTEMPTS: &str = "PROMPT_TOO_MANY_ATTEMPTS";
    pub const PROMPT_INFINITE_CANCEL: &str = "PROMPT_INFINITE_CANCEL";
    pub const PROMPT_INFINITE_INVALID_ARG: &str = "PROMPT_INFINITE_INVALID_ARG";
    pub const PROMPT_INFINITE_EMPTY: &str = "PROMPT_INFINITE_EMPTY";

    pub const ARG_DISAMBIGUATION: &str = "ARG_DISAMBIGUATION";
    pub const ARG_TOO_MANY_MATCHES: &str = "ARG_TOO_MANY_MATCHES";
    pub const ARG_TOO_SHORT: &str = "ARG_TOO_SHORT";
    pub const ARG_TOO_LONG: &str = "ARG_TOO_LONG";
    pub const ARG_TOO_SMALL: &str = "ARG_TOO_SMALL";
    pub const ARG_TOO_LARGE: &str = "ARG_TOO_LARGE";
    pub const ARG_NOT_ALLOWED: &str = "ARG_NOT_ALLOWED";

    pub const CMD_PING_RESPONSE: &str = "CMD_PING_RESPONSE";
    pub const CMD_HELP_ALL: &str = "CMD_HELP_ALL";
    pub const CMD_HELP_GROUP: &str = "CMD_HELP_GROUP";
    pub const CMD_HELP_COMMAND: &str = "CMD_HELP_COMMAND";
    pub const CMD_HELP_COMMAND_ALIASES: &str = "CMD_HELP_COMMAND_ALIASES";
    pub const CMD_HELP_UNIDENTIFIED: &str = "CMD_HELP_UNIDENTIFIED";
    pub const CMD_PREFIX_CURRENT: &str = "CMD_PREFIX_CURRENT";
    pub const CMD_PREFIX_MENTION_ONLY: &str = "CMD_PREFIX_MENTION_ONLY";
    pub const CMD_PREFIX_SET: &str = "CMD_PREFIX_SET";
    pub const CMD_PREFIX_RESET: &str = "CMD_PREFIX_RESET";
    pub const CMD_PREFIX_ADMIN_ONLY: &str = "CMD_PREFIX_ADMIN_ONLY";
    pub const CMD_LANG_CURRENT: &str = "CMD_LANG_CURRENT";
    pub const CMD_LANG_SET: &str = "CMD_LANG_SET";
    pub const CMD_LANG_RESET: &str = "CMD_LANG_RESET";
    pub const CMD_LANG_ADMIN_ONLY: &str = "CMD_LANG_ADMIN_ONLY";
    pub const CMD_LANG_UNKNOWN: &str = "CMD_LANG_UNKNOWN";
    pub const CMD_ENABLE_ENABLED: &str = "CMD_ENABLE_ENABLED";
    pub const CMD_ENABLE_ALREADY_ENABLED: &str = "CMD_ENABLE_ALREADY_ENABLED";
    pub const CMD_DISABLE_DISABLED: &str = "CMD_DISABLE_DISABLED";
    pub const CMD_DISABLE_ALREADY_DISABLED: &str = "CMD_DISABLE_ALREADY_DISABLED";
    pub const CMD_DISABLE_NOT_ALLOWED: &str = "CMD_DISABLE_NOT_ALLOWED";
    pub const CMD_TARGET_UNKNOWN: &str = "CMD_TARGET_UNKNOWN";
    pub const CMD_GROUPS_LIST: &str = "CMD_GROUPS_LIST";
    pub const CMD_UNLOAD_UNLOADED: &str = "CMD_UNLOAD_UNLOADED";

    pub const ARGS_PROMPT_COMMAND: &str = "ARGS_PROMPT_COMMAND";
    pub const ARGS_PROMPT_COMMAND_OR_GROUP: &str = "ARGS_PROMPT_COMMAND_OR_GROUP";
    pub const ARGS_PROMPT_PREFIX: &str = "ARGS_PROMPT_PREFIX";
    pub const ARGS_PROMPT_LANGUAGE: &str = "ARGS_PROMPT_LANGUAGE";
}

static ENGLISH: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    use keys::*;
    HashMap::from([
        (UNKNOWN_COMMAND, "Unknown command. Use `{0}help` to view the list of all commands."),
        (DENIED_OWNER_ONLY, "The `{0}` command can only be used by the bot owner."),
        (DENIED_GUILD_ONLY, "The `{0}` command must be used in a server channel."),
        (DENIED_NSFW_ONLY, "The `{0}` command can only be used in NSFW channels."),
        (DENIED_PERMISSION, "You need to be {1} to use the `{0}` command."),
        (DENIED_DISABLED, "The `{0}` command is disabled."),
        (THROTTLED, "You may not use the `{0}` command again for another {1} seconds."),
        (COMMAND_ERROR, "An error occurred while running the command. The error has been reported."),
        (COMMAND_ERROR_REPORT, "Command `{0}` failed in channel {1} for user {2}: {3}"),
        (PROMPT_INVALID_ARG, "You provided an invalid {0}. Please try again."),
        (PROMPT_CANCEL, "Respond with `{0}` to cancel the command. The command will automatically be cancelled in {1} seconds."),
        (PROMPT_CANCELLED, "Cancelled command."),
        (PROMPT_TIMED_OUT, "Cancelled command: no response was given in time."),
        (PROMPT_TOO_MANY_ATTEMPTS, "Cancelled command: too many invalid answers for {0}."),
        (PROMPT_INFINITE_CANCEL, "Respond with `{0}` to cancel the command, or `{1}` to finish entry up to this point. The command will automatically be cancelled in {2} seconds."),
        (PROMPT_INFINITE_INVALID_ARG, "You provided an invalid {0}, \"{1}\". Please try again."),
        (PROMPT_INFINITE_EMPTY, "At least one {0} is required."),
        (ARG_DISAMBIGUATION, "Multiple {0} found, please be more specific: {1}"),
        (ARG_TOO_MANY_MATCHES, "Multiple {0} found. Please be more specific."),
        (ARG_TOO_SHORT, "Please keep the {0} above or exactly {1} characters."),
        (ARG_TOO_LONG, "Please keep the {0} below or exactly {1} characters."),
        (ARG_TOO_SMALL, "Please enter a number above or exactly {0}."),
        (ARG_TOO_LARGE, "Please enter a number below or exactly {0}."),
        (ARG_NOT_ALLOWED, "Please enter one of the following options: {0}"),
        (CMD_PING_RESPONSE, "Pong!"),
        (CMD_HELP_ALL, "Available commands in {0}:"),
        (CMD_HELP_GROUP, "__{0}__: {1}"),
        (CMD_HELP_COMMAND, "__Command **{0}**:__ {1}\n**Format:** {2}\n**Group:** {3}"),
        (CMD_HELP_COMMAND_ALIASES, "**Aliases:** {0}"),
        (CMD_HELP_UNIDENTIFIED, "Unable to identify command `{0}`. Use `{1}help` to view the list of all commands."),
        (CMD_PREFIX_CURRENT, "The command prefix is `{0}`."),
        (CMD_PREFIX_MENTION_ONLY, "There is no command prefix, commands are only run by mention."),
        (CMD_PREFIX_SET, "Set the command prefix to `{0}`."),
        (CMD_PREFIX_RESET, "Reset the command prefix to the default (currently `{0}`)."),
        (CMD_PREFIX_ADMIN_ONLY, "Only administrators may change the command prefix."),
        (CMD_LANG_CURRENT, "The language is `{0}`."),
        (CMD_LANG_SET, "Set the language to `{0}`."),
        (CMD_LANG_RESET, "Reset the language to the default (currently `{0}`)."),
        (CMD_LANG_ADMIN_ONLY, "Only administrators may change the language."),
        (CMD_LANG_UNKNOWN, "Unknown language `{0}`. Available languages: {1}."),
        (CMD_ENABLE_ENABLED, "Enabled `{0}`."),
        (CMD_ENABLE_ALREADY_ENABLED, "`{0}` is already enabled."),
        (CMD_DISABLE_DISABLED, "Disabled `{0}`."),
        (CMD_DISABLE_ALREADY_DISABLED, "`{0}` is already disabled."),
        (CMD_DISABLE_NOT_ALLOWED, "You cannot disable `{0}`."),
        (CMD_TARGET_UNKNOWN, "No command or group named `{0}`."),
        (CMD_GROUPS_LIST, "__**Groups**__\n{0}"),
        (CMD_UNLOAD_UNLOADED, "Unloaded the `{0}` command."),
        (ARGS_PROMPT_COMMAND, "Which command?"),
        (ARGS_PROMPT_COMMAND_OR_GROUP, "Which command or group?"),
        (ARGS_PROMPT_PREFIX, "What should the prefix be?"),
        (ARGS_PROMPT_LANGUAGE, "Which language?"),
    ])
});

static FRENCH: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    use keys::*;
    HashMap::from([
        (UNKNOWN_COMMAND, "Commande inconnue. Utilisez `{0}help` pour voir la liste des commandes."),
        (DENIED_OWNER_ONLY, "La commande `{0}` est réservée au propriétaire du bot."),
        (DENIED_GUILD_ONLY, "La commande `{0}` doit être utilisée dans un salon de serveur."),
        (DENIED_NSFW_ONLY, "La commande `{0}` n'est disponible que dans les salons NSFW."),
        (DENIED_PERMISSION, "Vous devez être {1} pour utiliser la commande `{0}`."),
        (DENIED_DISABLED, "La commande `{0}` est désactivée."),
        (THROTTLED, "Vous ne pourrez pas réutiliser la commande `{0}` avant {1} secondes."),
        (COMMAND_ERROR, "Une erreur est survenue pendant l'exécution de la commande. Elle a été signalée."),
        (PROMPT_INVALID_ARG, "Votre {0} est invalide. Veuillez réessayer."),
        (PROMPT_CANCEL, "Répondez `{0}` pour annuler la commande. Elle sera annulée automatiquement dans {1} secondes."),
        (PROMPT_CANCELLED, "Commande annulée."),
        (PROMPT_TIMED_OUT, "Commande annulée : aucune réponse à temps."),
        (PROMPT_TOO_MANY_ATTEMPTS, "Commande annulée : trop de réponses invalides pour {0}."),
        (PROMPT_INFINITE_CANCEL, "Répondez `{0}` pour annuler la commande, ou `{1}` pour terminer la saisie. La commande sera annulée automatiquement dans {2} secondes."),
        (PROMPT_INFINITE_INVALID_ARG, "Votre {0} \"{1}\" est invalide. Veuillez réessayer."),
        (PROMPT_INFINITE_EMPTY, "Au moins un {0} est requis."),
        (ARG_DISAMBIGUATION, "Plusieurs {0} trouvés, soyez plus précis : {1}"),
        (ARG_TOO_MANY_MATCHES, "Plusieurs {0} trouvés. Soyez plus précis."),
        (ARG_TOO_SHORT, "Le {0} doit faire au moins {1} caractères."),
        (ARG_TOO_LONG, "Le {0} doit faire au plus {1} caractères."),
        (ARG_TOO_SMALL, "Veuillez entrer un nombre supérieur ou égal à {0}."),
        (ARG_TOO_LARGE, "Veuillez entrer un nombre inférieur ou égal à {0}."),
        (ARG_NOT_ALLOWED, "Veuillez entrer l'une des options suivantes : {0}"),
        (CMD_PING_RESPONSE, "Pong !"),
        (CMD_HELP_ALL, "Commandes disponibles dans {0} :"),
        (CMD_HELP_COMMAND, "__Commande **{0}** :__ {1}\n**Format :** {2}\n**Groupe :** {3}"),
        (CMD_HELP_COMMAND_ALIASES, "**Alias :** {0}"),
        (CMD_HELP_UNIDENTIFIED, "Commande `{0}` introuvable. Utilisez `{1}help` pour voir la liste des commandes."),
        (CMD_PREFIX_CURRENT, "Le préfixe des commandes est `{0}`."),
        (CMD_PREFIX_MENTION_ONLY, "Il n'y a pas de préfixe, les commandes ne répondent qu'aux mentions."),
        (CMD_PREFIX_SET, "Préfixe des commandes défini sur `{0}`."),
        (CMD_PREFIX_RESET, "Préfixe des commandes réinitialisé (actuellement `{0}`)."),
        (CMD_PREFIX_ADMIN_ONLY, "Seuls les administrateurs peuvent changer le préfixe."),
        (CMD_LANG_CURRENT, "La langue est `{0}`."),
        (CMD_LANG_SET, "Langue définie sur `{0}`."),
        (CMD_LANG_RESET, "Langue réinitialisée (actuellement `{0}`)."),
        (CMD_LANG_ADMIN_ONLY, "Seuls les administrateurs peuvent changer la langue."),
        (CMD_LANG_UNKNOWN, "Langue inconnue `{0}`. Langues disponibles : {1}."),
        (CMD_ENABLE_ENABLED, "`{0}` activé."),
        (CMD_ENABLE_ALREADY_ENABLED, "`{0}` est déjà activé."),
        (CMD_DISABLE_DISABLED, "`{0}` désactivé."),
        (CMD_DISABLE_ALREADY_DISABLED, "`{0}` est déjà désactivé."),
        (CMD_DISABLE_NOT_ALLOWED, "Vous ne pouvez pas désactiver `{0}`."),
        (CMD_TARGET_UNKNOWN, "Aucune commande ni groupe nommé `{0}`."),
        (CMD_GROUPS_LIST, "__**Groupes**__\n{0}"),
        (CMD_UNLOAD_UNLOADED, "Commande `{0}` déchargée."),
        (ARGS_PROMPT_COMMAND, "Quelle commande ?"),
        (ARGS_PROMPT_COMMAND_OR_GROUP, "Quelle commande ou quel groupe ?"),
        (ARGS_PROMPT_PREFIX, "Quel doit être le préfixe ?"),
        (ARGS_PROMPT_LANGUAGE, "Quelle langue ?"),
    ])
});

/// Resolves user-facing strings by key. Locale handling is entirely up to the implementor.
pub trait Translator: Send + Sync {
    fn translate(&self, locale: &str, key: &str, params: &[String]) -> String;

    /// Locales a guild may switch to, sorted.
    fn locales(&self) -> Vec<String>;

    fn has_locale(&self, locale: &str) -> bool {
        self.locales().iter().any(|l| l == locale)
    }
}

/// Locale tables with `{0}`-style positional parameters. Lookups fall back to English and
/// then to the key itself, so literal prompt text passes through unchanged.
pub struct StringTable {
    locales: HashMap<String, HashMap<String, String>>,
}

impl StringTable {
    /// English and French.
    pub fn new() -> Self {
        let mut locales = HashMap::new();
        locales.insert(DEFAULT_LOCALE.to_string(), owned(&ENGLISH));
        locales.insert("fr".to_string(), owned(&FRENCH));
        Self { locales }
    }

    pub fn insert_locale(&mut self, locale: impl Into<String>, strings: HashMap<String, String>) {
        self.locales.entry(locale.into()).or_default().extend(strings);
    }

    fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        self.locales
            .get(locale)
            .and_then(|table| table.get(key))
            .or_else(|| self.locales.get(DEFAULT_LOCALE).and_then(|table| table.get(key)))
            .map(String::as_str)
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for StringTable {
    fn translate(&self, locale: &str, key: &str, params: &[String]) -> String {
        let template = self.lookup(locale, key).unwrap_or(key);
        fill(template, params)
    }

    fn locales(&self) -> Vec<String> {
        let mut locales: Vec<String> = self.locales.keys().cloned().collect();
        locales.sort();
        locales
    }

    fn has_locale(&self, locale: &str) -> bool {
        self.locales.contains_key(locale)
    }
}

fn owned(table: &HashMap<&'static str, &'static str>) -> HashMap<String, String> {
    table.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn fill(template: &str, params: &[String]) -> String {
    let mut out = template.to_string();
    for (i, param) in params.iter().enumerate() {
        out = out.replace(&format!("{{{i}}}"), param);
    }
    out
}
