//! Recipes that ship with Kiln.
//!
//! Built-ins are constructed in code so they are always available, even
//! without a recipes directory. User recipes loaded from TOML (see
//! [`crate::recipe_loader`]) may replace them by name.
//!
//! # `rails-starter`
//!
//! Turns a freshly generated Rails application (the workspace) into a
//! starter app with Devise users, an admin dashboard, Sidekiq, webpack,
//! announcements, notifications, OmniAuth, friendly ids, HAML views, a
//! sitemap, rubocop, and an initial git commit. Template files (Procfile,
//! layouts, webpack config, ...) come from the template source.
//!
//! Rails 5.2 and Rails 6 differ in a handful of places; those steps carry a
//! version guard and only run when `--framework-version` matches.

use semver::VersionReq;
use tracing::debug;

use kiln_core::domain::{
    DomainError, Environment, FileTarget, Insertion, Pattern, Recipe, Step, StepAction,
    Substitution, ToolInvocation,
};

/// Name of the default built-in recipe.
pub const RAILS_STARTER: &str = "rails-starter";

const RAILS_5: &str = ">=5.2.0, <6.0.0-beta1";
const RAILS_6: &str = ">=6.0.0-beta1, <7";

/// Every built-in recipe.
pub fn all_recipes() -> Result<Vec<Recipe>, DomainError> {
    let recipes = vec![rails_starter()?];
    debug!(count = recipes.len(), "built-in recipes ready");
    Ok(recipes)
}

// ── Step helpers ──────────────────────────────────────────────────────────────
// Small constructors mirroring the generator DSL the recipe is written in.

fn req(raw: &str) -> Result<VersionReq, DomainError> {
    VersionReq::parse(raw).map_err(|e| DomainError::InvalidVersion {
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn rails(label: &str, task: &str) -> Step {
    Step::new(
        label,
        StepAction::RunExternal(ToolInvocation::new("bin/rails").arg(task)),
    )
}

fn shell(label: &str, line: &str) -> Step {
    Step::new(label, StepAction::RunExternal(ToolInvocation::shell(line)))
}

fn generate(label: &str, generator: &str, args: &[&str]) -> Step {
    Step::new(
        label,
        StepAction::Generate {
            generator: generator.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            environment: None,
        },
    )
}

fn append_gem(line: &str) -> Step {
    let name = line
        .split('"')
        .nth(1)
        .unwrap_or(line)
        .to_string();
    Step::new(
        format!("gem {name}"),
        StepAction::Patch {
            target: "Gemfile".into(),
            insertion: Insertion::after(end_of_file(), format!("{line}\n")),
        },
    )
}

fn end_of_file() -> Pattern {
    // `\z` always matches, so appending can never miss.
    Pattern::regex(r"\z").unwrap_or_else(|_| Pattern::literal("\n"))
}

/// Insert a line into `config/application.rb`, or into the given
/// environment file.
fn environment(label: &str, line: &str, env: Option<Environment>) -> Step {
    let (target, anchor, indent) = match env {
        None => (
            "config/application.rb".to_string(),
            "class Application < Rails::Application\n",
            "    ",
        ),
        Some(env) => (
            format!("config/environments/{env}.rb"),
            "Rails.application.configure do\n",
            "  ",
        ),
    };
    let text: String = line
        .lines()
        .map(|l| format!("{indent}{l}\n"))
        .collect();
    Step::new(
        label,
        StepAction::Patch {
            target: FileTarget::path(target.as_str()),
            insertion: Insertion::after(Pattern::literal(anchor), format!("{text}\n")),
        },
    )
}

fn route(label: &str, line: &str) -> Step {
    Step::new(
        label,
        StepAction::Patch {
            target: "config/routes.rb".into(),
            insertion: Insertion::after(
                Pattern::literal("Rails.application.routes.draw do\n"),
                format!("  {line}\n"),
            ),
        },
    )
}

/// Replace every match of `pattern` in `file`.
fn gsub(label: &str, file: &str, pattern: &str, replacement: &str) -> Result<Step, DomainError> {
    Ok(Step::new(
        label,
        StepAction::Substitute {
            target: file.into(),
            substitution: Substitution::new(Pattern::regex(pattern)?, replacement).all(),
        },
    ))
}

fn inject(label: &str, target: FileTarget, insertion: Insertion) -> Step {
    Step::new(label, StepAction::Patch { target, insertion })
}

fn copy(src: &str) -> Step {
    Step::new(
        format!("copy {src}"),
        StepAction::CopyFile {
            src: src.into(),
            dst: src.into(),
            force: false,
        },
    )
}

fn copy_forced(label: &str, src: &str) -> Step {
    Step::new(
        label,
        StepAction::CopyFile {
            src: src.into(),
            dst: src.into(),
            force: true,
        },
    )
}

fn directory(src: &str) -> Step {
    Step::new(
        format!("copy {src}/"),
        StepAction::CopyDirectory {
            src: src.into(),
            dst: src.into(),
            force: true,
        },
    )
}

fn remove(label: &str, path: &str) -> Step {
    Step::new(label, StepAction::RemoveFile { path: path.into() })
}

fn say(label: &str, message: &str) -> Step {
    Step::new(
        label,
        StepAction::Announce {
            message: message.into(),
        },
    )
}

// ── rails-starter ─────────────────────────────────────────────────────────────

const GEMS: &[&str] = &[
    r#"gem "administrate", github: "excid3/administrate", branch: "zeitwerk""#,
    r#"gem "bootstrap", "~> 4.3", ">= 4.3.1""#,
    r#"gem "brakeman", group: "development""#,
    r#"gem "devise_masquerade", "~> 0.6.2""#,
    r#"gem "devise-bootstrapped", github: "excid3/devise-bootstrapped", branch: "bootstrap4""#,
    r#"gem "devise", "~> 4.6", ">= 4.6.1""#,
    r#"gem "font-awesome-sass", "~> 5.6", ">= 5.6.1""#,
    r#"gem "friendly_id", "~> 5.2", ">= 5.2.5""#,
    r#"gem "gravatar_image_tag", github: "mdeering/gravatar_image_tag""#,
    r#"gem "haml-rails", "~> 2.0""#,
    r#"gem "mini_magick", "~> 4.9", ">= 4.9.2""#,
    r#"gem "name_of_person", "~> 1.1""#,
    r#"gem "omniauth-facebook", "~> 5.0""#,
    r#"gem "omniauth-github", "~> 1.3""#,
    r#"gem "omniauth-twitter", "~> 1.4""#,
    r#"gem "pry-rails", group: "development, test""#,
    r#"gem "rubocop", "~> 0.60", group: "development, test""#,
    r#"gem "sidekiq", "~> 5.2", ">= 5.2.5""#,
    r#"gem "sitemap_generator", "~> 6.0", ">= 6.0.1""#,
    r#"gem "whenever", require: false"#,
];

const WEBPACK_PROVIDE: &str = "const webpack = require('webpack')
environment.plugins.append('Provide', new webpack.ProvidePlugin({
  $: 'jquery',
  jQuery: 'jquery',
  Rails: '@rails/ujs'
}))

";

const SIDEKIQ_ROUTE: &str = "    authenticate :user, lambda { |u| u.admin? } do
      mount Sidekiq::Web => '/sidekiq'
    end


";

const OMNIAUTH_PROVIDERS: &str = "  env_creds = Rails.application.credentials[Rails.env.to_sym] || {}
  %i{ facebook twitter github }.each do |provider|
    if options = env_creds[provider]
      config.omniauth provider, options[:app_id], options[:app_secret], options.fetch(:options, {})
    end
  end

";

const ADMINISTRATE_HELPERS: &str = "# Expose our application's helpers to Administrate
config.to_prepare do
  Administrate::ApplicationController.helper {{APP_NAME_PASCAL}}::Application.helpers
end";

/// The full Rails starter recipe.
pub fn rails_starter() -> Result<Recipe, DomainError> {
    let rails_5 = req(RAILS_5)?;
    let rails_6 = req(RAILS_6)?;

    let mut steps: Vec<Step> = GEMS.iter().map(|line| append_gem(line)).collect();

    steps.extend([
        gsub(
            "pin sqlite3",
            "Gemfile",
            r"gem 'sqlite3'",
            "gem 'sqlite3', '~> 1.3.0'",
        )?
        .when(rails_5.clone()),
        append_gem(r#"gem "webpacker", "~> 4.0.2""#).when(rails_5.clone()),
        shell("bundle install", "bundle install"),
        // Application name
        environment(
            "application name (rails 5)",
            "config.application_name = Rails.application.class.parent_name",
            None,
        )
        .when(rails_5.clone()),
        environment(
            "application name",
            "config.application_name = Rails.application.class.module_parent_name",
            None,
        )
        .when(rails_6),
        say(
            "application name notice",
            "You can change application name inside: ./config/application.rb",
        ),
        shell("stop spring", "spring stop"),
        // Users
        generate("devise install", "devise:install", &[]),
        environment(
            "mailer host",
            "config.action_mailer.default_url_options = { host: 'localhost', port: 3000 }",
            Some(Environment::Development),
        ),
        route("root route", "root to: 'home#index'"),
        generate("devise views", "devise:views:bootstrapped", &[]),
        generate(
            "devise user",
            "devise",
            &[
                "User",
                "first_name",
                "last_name",
                "announcements_last_read_at:datetime",
                "admin:boolean",
            ],
        ),
        Step::new(
            "admin defaults to false",
            StepAction::Substitute {
                target: FileTarget::NewestIn {
                    dir: "db/migrate".into(),
                },
                substitution: Substitution::new(
                    Pattern::literal(":admin"),
                    ":admin, default: false",
                ),
            },
        ),
        gsub(
            "devise secret key",
            "config/initializers/devise.rb",
            r"  # config.secret_key = .+",
            "  config.secret_key = Rails.application.credentials.secret_key_base",
        )?
        .when(req(">5.2")?),
        inject(
            "masqueradable users",
            "app/models/user.rb".into(),
            Insertion::after(Pattern::literal("devise :"), "omniauthable, :masqueradable, :"),
        ),
        // Webpack and JavaScript
        rails("webpacker install", "webpacker:install").when(rails_5.clone()),
        shell(
            "javascript packages",
            "yarn add expose-loader jquery popper.js bootstrap data-confirm-modal local-time \
             turbolinks@^5.1.1 @rails/webpacker@next babel-plugin-dynamic-import-node \
             babel-plugin-macros postcss-flexbugs-fixes @babel/plugin-proposal-class-properties \
             @babel/plugin-proposal-object-rest-spread postcss-preset-env \
             @babel/plugin-syntax-dynamic-import @babel/plugin-transform-destructuring \
             @babel/plugin-transform-regenerator @babel/core @babel/plugin-transform-runtime",
        ),
        shell(
            "rails javascript packages",
            "yarn add @rails/actioncable@pre @rails/actiontext@pre @rails/activestorage@pre @rails/ujs@pre",
        )
        .when(rails_5),
        shell(
            "javascript dev packages",
            "yarn add -D prettier webpack-cli eslint eslint-config-airbnb eslint-config-prettier \
             eslint-import-resolver-webpack eslint-plugin-import eslint-plugin-jsx-a11y \
             eslint-plugin-prettier",
        ),
        inject(
            "provide jquery",
            "config/webpack/environment.js".into(),
            Insertion::before(Pattern::literal("module.exports = environment"), WEBPACK_PROVIDE),
        ),
        // Webpacker layout
        shell("drop app/assets", "rm -rf ./app/assets"),
        gsub(
            "webpacker source path",
            "config/webpacker.yml",
            r"source_path: app/javascript",
            "source_path: app/frontend",
        )?,
        shell("drop app/javascript", "rm -rf ./app/javascript"),
        remove("drop webpack environment", "config/webpack/environment.js"),
        copy("config/webpack/environment.js"),
        // Announcements and notifications
        generate(
            "announcement model",
            "model",
            &[
                "Announcement",
                "published_at:datetime",
                "announcement_type",
                "name",
                "description:text",
            ],
        ),
        route("announcements route", "resources :announcements, only: [:index]"),
        generate(
            "notification model",
            "model",
            &[
                "Notification",
                "recipient_id:bigint",
                "actor_id:bigint",
                "read_at:datetime",
                "action:string",
                "notifiable_id:bigint",
                "notifiable_type:string",
            ],
        ),
        route("notifications route", "resources :notifications, only: [:index]"),
        // OmniAuth
        inject(
            "omniauth callbacks",
            "config/routes.rb".into(),
            Insertion::after(
                Pattern::literal("  devise_for :users"),
                r#", controllers: { omniauth_callbacks: "users/omniauth_callbacks" }"#,
            ),
        ),
        generate(
            "service model",
            "model",
            &[
                "Service",
                "user:references",
                "provider",
                "uid",
                "access_token",
                "access_token_secret",
                "refresh_token",
                "expires_at:datetime",
                "auth:text",
            ],
        ),
        inject(
            "omniauth providers",
            "config/initializers/devise.rb".into(),
            Insertion::before(Pattern::literal("  # ==> Warden configuration"), OMNIAUTH_PROVIDERS),
        ),
        // Sidekiq
        environment(
            "sidekiq adapter",
            "config.active_job.queue_adapter = :sidekiq",
            None,
        ),
        inject(
            "require sidekiq web",
            "config/routes.rb".into(),
            Insertion::before(
                Pattern::literal("Rails.application.routes.draw do"),
                "require 'sidekiq/web'\n\n",
            ),
        ),
        inject(
            "sidekiq dashboard route",
            "config/routes.rb".into(),
            Insertion::after(Pattern::literal("Rails.application.routes.draw do\n"), SIDEKIQ_ROUTE),
        ),
        // friendly_id
        generate("friendly_id install", "friendly_id", &[]),
        inject(
            "friendly_id migration version",
            FileTarget::FirstMatching {
                dir: "db/migrate".into(),
                suffix: "friendly_id_slugs.rb".into(),
            },
            Insertion::after(Pattern::literal("ActiveRecord::Migration"), "[5.2]"),
        ),
        // Templates
        copy("Procfile"),
        copy("Procfile.dev"),
        copy(".foreman"),
        copy(".eslintignore"),
        copy(".eslintrc.js"),
        copy(".prettierignore"),
        copy("prettier.config.js"),
        remove("drop babel config", "babel.config.js"),
        copy("babel.config.js"),
        directory("app"),
        directory("config"),
        directory("lib"),
        route("terms route", "get '/terms', to: 'home#terms'"),
        route("privacy route", "get '/privacy', to: 'home#privacy'"),
        // Conversions and installers
        shell(
            "convert views to haml",
            "yes | HAML_RAILS_DELETE_ERB=true bin/rails haml:erb2haml",
        ),
        shell("wheneverize", "wheneverize ."),
        rails("sitemap install", "sitemap:install"),
        // Database
        Step::new(
            "reset database",
            StepAction::RunExternal(ToolInvocation::new("bin/rails").arg("db:reset").destructive()),
        ),
        Step::new(
            "migrate development",
            StepAction::RunExternal(
                ToolInvocation::new("bin/rails")
                    .arg("db:migrate")
                    .in_environment(Environment::Development),
            ),
        ),
        Step::new(
            "migrate test",
            StepAction::RunExternal(
                ToolInvocation::new("bin/rails")
                    .arg("db:migrate")
                    .in_environment(Environment::Test),
            ),
        ),
        // Administrate (needs the migrated schema)
        generate("administrate install", "administrate:install", &[]),
        gsub(
            "announcement type select",
            "app/dashboards/announcement_dashboard.rb",
            r"announcement_type: Field::String",
            "announcement_type: Field::Select.with_options(collection: Announcement::TYPES)",
        )?,
        gsub(
            "user password field",
            "app/dashboards/user_dashboard.rb",
            r"email: Field::String",
            "email: Field::String,\n    password: Field::String.with_options(searchable: false)",
        )?,
        gsub(
            "user password form attribute",
            "app/dashboards/user_dashboard.rb",
            r"FORM_ATTRIBUTES = \[",
            "FORM_ATTRIBUTES = [\n    :password,",
        )?,
        gsub(
            "admin authentication",
            "app/controllers/admin/application_controller.rb",
            r"# TODO Add authentication logic here\.",
            "redirect_to '/', alert: 'Not authorized.' unless user_signed_in? && current_user.admin?",
        )?,
        environment("administrate helpers", ADMINISTRATE_HELPERS, None),
        // Layout
        remove(
            "drop application layout",
            "app/views/layouts/application.html.haml",
        ),
        copy("app/views/layouts/application.html.haml"),
        // Lint
        shell("rubocop binstub", "bundle binstubs rubocop"),
        copy_forced("copy .rubocop.yml", ".rubocop.yml"),
        // rubocop exits 1 when offenses remain after autocorrect.
        Step::new(
            "rubocop autocorrect",
            StepAction::RunExternal(
                ToolInvocation::new("bundle")
                    .args(["exec", "rubocop", "-a"])
                    .expect_exit_codes(vec![0, 1]),
            ),
        ),
        // Version control
        Step::new(
            "git init",
            StepAction::RunExternal(ToolInvocation::new("git").arg("init")),
        ),
        Step::new(
            "git add",
            StepAction::RunExternal(ToolInvocation::new("git").args(["add", "."])),
        ),
        Step::new(
            "git commit",
            StepAction::RunExternal(
                ToolInvocation::new("git").args(["commit", "-m", "Initial commit"]),
            ),
        ),
    ]);

    Recipe::builder()
        .name(RAILS_STARTER)
        .version("1.0.0")
        .description(
            "Rails starter: Devise, Administrate, Sidekiq, webpack, OmniAuth, HAML, rubocop",
        )
        .steps(steps)
        .farewell("{{APP_NAME}} successfully created!")
        .farewell("To get started with your new app:")
        .farewell("cd {{APP_NAME}} - Switch to your new app's directory.")
        .farewell("foreman start - Run Rails, sidekiq, and webpack-dev-server.")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::domain::{Occurrence, StepKind};

    #[test]
    fn rails_starter_is_valid() {
        let recipe = rails_starter().unwrap();
        assert_eq!(recipe.name, RAILS_STARTER);
        assert!(recipe.step_count() > 60);
        assert_eq!(recipe.farewell.len(), 4);
    }

    #[test]
    fn only_db_reset_is_destructive() {
        let recipe = rails_starter().unwrap();
        let labels: Vec<_> = recipe
            .destructive_steps()
            .map(|s| s.label.as_str())
            .collect();
        assert_eq!(labels, ["reset database"]);
    }

    #[test]
    fn rails_5_steps_are_guarded() {
        let recipe = rails_starter().unwrap();
        let v5 = semver::Version::new(5, 2, 3);
        let v6 = semver::Version::new(6, 0, 0);

        let webpacker = recipe
            .steps
            .iter()
            .find(|s| s.label == "webpacker install")
            .unwrap();
        assert!(webpacker.admits(Some(&v5)));
        assert!(!webpacker.admits(Some(&v6)));

        let app_name: Vec<_> = recipe
            .steps
            .iter()
            .filter(|s| s.label.starts_with("application name ("))
            .chain(recipe.steps.iter().filter(|s| s.label == "application name"))
            .collect();
        assert_eq!(app_name.len(), 2);
        assert!(app_name[0].admits(Some(&v5)) && !app_name[0].admits(Some(&v6)));
        assert!(app_name[1].admits(Some(&v6)) && !app_name[1].admits(Some(&v5)));
    }

    #[test]
    fn migrations_run_before_administrate() {
        let recipe = rails_starter().unwrap();
        let position = |label: &str| recipe.steps.iter().position(|s| s.label == label).unwrap();
        assert!(position("reset database") < position("migrate test"));
        assert!(position("migrate test") < position("administrate install"));
        assert_eq!(recipe.steps.last().unwrap().label, "git commit");
    }

    #[test]
    fn gem_steps_append_to_gemfile() {
        let recipe = rails_starter().unwrap();
        let gem = recipe.steps.iter().find(|s| s.label == "gem devise").unwrap();
        match &gem.action {
            StepAction::Patch { insertion, .. } => {
                let out = insertion.apply("Gemfile", "source 'x'\n").unwrap();
                assert_eq!(out, "source 'x'\ngem \"devise\", \"~> 4.6\", \">= 4.6.1\"\n");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(gem.kind(), StepKind::Patch);
    }

    #[test]
    fn gsub_replaces_every_match() {
        let step = gsub("quotes", "Gemfile", "\"", "'").unwrap();
        match step.action {
            StepAction::Substitute { substitution, .. } => {
                assert_eq!(substitution.occurrence, Occurrence::All);
                let out = substitution
                    .apply("Gemfile", "gem \"a\"\ngem \"b\"\n")
                    .unwrap();
                assert_eq!(out, "gem 'a'\ngem 'b'\n");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let recipe = rails_starter().unwrap();
        let mut occurrences = recipe.steps.iter().filter_map(|s| match &s.action {
            StepAction::Substitute { substitution, .. } => Some(substitution.occurrence),
            _ => None,
        });
        assert!(occurrences.all(|o| o == Occurrence::All));
    }

    #[test]
    fn environment_lines_are_indented() {
        let step = environment("x", "config.a = 1", Some(Environment::Development));
        match step.action {
            StepAction::Patch { target, insertion } => {
                assert_eq!(target.to_string(), "config/environments/development.rb");
                assert_eq!(insertion.text, "  config.a = 1\n\n");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
