//! Inspector CLI
//!
//! Command-line interface for the SMS inspector API.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use inspector_client::InspectorClient;
use inspector_types::{
    ProxySettings, SmsSearchRequest, SmsSearchResponse, UpdateSettingsRequest, UserId, UserStatus,
};

#[derive(Parser)]
#[command(name = "inspector")]
#[command(author, version, about = "SMS inspector API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the inspector API
    #[arg(
        long,
        env = "INSPECTOR_API_URL",
        default_value = "http://localhost:3000"
    )]
    api_url: String,

    /// Session token printed by `inspector login`
    #[arg(long, env = "INSPECTOR_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Show site name and feature flags
    Site,
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "INSPECTOR_PASSWORD")]
        password: String,
    },
    /// Sign in and print the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "INSPECTOR_PASSWORD")]
        password: String,
    },
    /// Show the signed-in user
    Me,
    /// Change your name and email
    Profile {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// SMS record operations
    Sms {
        #[command(subcommand)]
        action: SmsCommands,
    },
    /// Shared number list
    Numbers {
        #[command(subcommand)]
        action: NumberCommands,
    },
    /// Admin panel operations
    Admin {
        #[command(flatten)]
        credentials: AdminArgs,
        #[command(subcommand)]
        action: AdminCommands,
    },
}

#[derive(Subcommand)]
enum SmsCommands {
    /// Fetch records for a date range
    Search {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day, inclusive (defaults to the first day)
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        sender: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
        /// Print one block per phone number instead of raw JSON
        #[arg(long)]
        grouped: bool,
    },
    /// Extract the code and link from a message
    Analyze { message: String },
    /// Summarize a message
    Summarize { message: String },
}

#[derive(Subcommand)]
enum NumberCommands {
    /// Print the shared number list
    List,
    /// Append numbers (requires the add-numbers permission)
    Add {
        #[arg(required = true)]
        numbers: Vec<String>,
    },
}

#[derive(Args)]
struct AdminArgs {
    /// Admin panel username
    #[arg(long = "admin-username", env = "INSPECTOR_ADMIN_USERNAME", default_value = "admin")]
    username: String,
    /// Admin panel password
    #[arg(long = "admin-password", env = "INSPECTOR_ADMIN_PASSWORD")]
    password: String,
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Print all settings
    Settings,
    /// Change settings; omitted options are left unchanged
    Configure(ConfigureArgs),
    /// List users
    Users,
    /// Block a user
    Block { id: String },
    /// Unblock a user
    Unblock { id: String },
    /// Grant or revoke the permission to add numbers
    AllowNumbers {
        id: String,
        #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
        enabled: bool,
    },
    /// Replace the shared number list
    ReplaceNumbers { numbers: Vec<String> },
}

#[derive(Args, Default)]
struct ConfigureArgs {
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    site_name: Option<String>,
    /// HSL triple, e.g. "217.2 91.2% 59.8%"
    #[arg(long)]
    primary_color: Option<String>,
    #[arg(long)]
    signup_enabled: Option<bool>,
    #[arg(long)]
    email_change_enabled: Option<bool>,
    /// Proxy host; the proxy is tested before anything is saved
    #[arg(long)]
    proxy_ip: Option<String>,
    #[arg(long, requires = "proxy_ip")]
    proxy_port: Option<u16>,
    #[arg(long, requires = "proxy_ip")]
    proxy_username: Option<String>,
    #[arg(long, requires = "proxy_ip")]
    proxy_password: Option<String>,
    /// Switch the proxy off
    #[arg(long, conflicts_with = "proxy_ip")]
    clear_proxy: bool,
}

impl ConfigureArgs {
    fn into_request(self) -> UpdateSettingsRequest {
        let proxy_settings = if self.clear_proxy {
            Some(ProxySettings::default())
        } else {
            self.proxy_ip.map(|ip| ProxySettings {
                ip,
                port: self.proxy_port.unwrap_or(0),
                username: self.proxy_username.unwrap_or_default(),
                password: self.proxy_password.unwrap_or_default(),
            })
        };

        UpdateSettingsRequest {
            api_key: self.api_key,
            proxy_settings,
            signup_enabled: self.signup_enabled,
            site_name: self.site_name,
            primary_color: self.primary_color,
            email_change_enabled: self.email_change_enabled,
            number_list: None,
            error_mappings: None,
        }
    }
}

fn parse_user_id(s: &str) -> Result<UserId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid user ID: {}", s))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_grouped(result: &SmsSearchResponse) {
    println!("{} records, {} numbers", result.total, result.groups.len());
    for group in &result.groups {
        println!();
        println!("{}  ({})", group.phone, group.sender_id);
        for sms in &group.messages {
            println!("  {}  {}", sms.date_time, sms.message);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = InspectorClient::new(&cli.api_url);
    if let Some(token) = cli.token {
        client = client.with_token(token);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Site => print_json(&client.site_settings().await?)?,

        Commands::Signup {
            name,
            email,
            password,
        } => print_json(&client.signup(&name, &email, &password).await?)?,

        Commands::Login { email, password } => {
            client.login(&email, &password).await?;
            // Plain output so it can be captured into INSPECTOR_TOKEN
            if let Some(token) = client.token() {
                println!("{}", token);
            }
        }

        Commands::Me => print_json(&client.me().await?)?,

        Commands::Profile { name, email } => {
            print_json(&client.update_profile(&name, &email).await?)?
        }

        Commands::Sms { action } => match action {
            SmsCommands::Search {
                start,
                end,
                sender,
                phone,
                page,
                per_page,
                grouped,
            } => {
                let req = SmsSearchRequest {
                    start_date: start,
                    end_date: end.unwrap_or(start),
                    sender_id: sender,
                    phone,
                    page,
                    per_page,
                };
                let result = client.search_sms(&req).await?;
                if grouped {
                    print_grouped(&result);
                } else {
                    print_json(&result)?;
                }
            }
            SmsCommands::Analyze { message } => {
                print_json(&client.analyze_message(&message).await?)?
            }
            SmsCommands::Summarize { message } => {
                println!("{}", client.summarize_message(&message).await?.summary)
            }
        },

        Commands::Numbers { action } => match action {
            NumberCommands::List => {
                for number in client.list_numbers().await? {
                    println!("{}", number);
                }
            }
            NumberCommands::Add { numbers } => {
                let list = client.add_numbers(numbers).await?;
                println!("✓ Number list now has {} entries", list.len());
            }
        },

        Commands::Admin {
            credentials,
            action,
        } => {
            client
                .admin_login(&credentials.username, &credentials.password)
                .await?;

            match action {
                AdminCommands::Settings => print_json(&client.get_settings().await?)?,
                AdminCommands::Configure(args) => {
                    let result = client.update_settings(&args.into_request()).await?;
                    if let Some(answer) = &result.proxy_check {
                        println!("✓ Proxy answered: {}", answer);
                    }
                    print_json(&result.settings)?;
                }
                AdminCommands::Users => print_json(&client.list_users().await?)?,
                AdminCommands::Block { id } => {
                    let user = client
                        .set_user_status(parse_user_id(&id)?, UserStatus::Blocked)
                        .await?;
                    println!("✓ {} blocked", user.email);
                }
                AdminCommands::Unblock { id } => {
                    let user = client
                        .set_user_status(parse_user_id(&id)?, UserStatus::Active)
                        .await?;
                    println!("✓ {} unblocked", user.email);
                }
                AdminCommands::AllowNumbers { id, enabled } => {
                    let user = client
                        .set_number_permission(parse_user_id(&id)?, enabled)
                        .await?;
                    print_json(&user)?;
                }
                AdminCommands::ReplaceNumbers { numbers } => {
                    let list = client.replace_numbers(numbers).await?;
                    println!("✓ Number list now has {} entries", list.len());
                }
            }

            client.admin_logout().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_end_defaults_to_start() {
        let cli = Cli::try_parse_from(["inspector", "sms", "search", "--start", "2024-05-01"])
            .unwrap();
        let Commands::Sms {
            action: SmsCommands::Search { start, end, .. },
        } = cli.command
        else {
            panic!("expected sms search");
        };
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!(end.is_none());
    }

    #[test]
    fn test_clear_proxy_sends_empty_host() {
        let args = ConfigureArgs {
            clear_proxy: true,
            ..Default::default()
        };
        let req = args.into_request();
        assert!(req.proxy_settings.unwrap().is_disabled());
    }

    #[test]
    fn test_proxy_options_build_settings() {
        let args = ConfigureArgs {
            proxy_ip: Some("203.0.113.7".into()),
            proxy_port: Some(8080),
            proxy_username: Some("u".into()),
            ..Default::default()
        };
        let proxy = args.into_request().proxy_settings.unwrap();
        assert_eq!(proxy.port, 8080);
        assert_eq!(proxy.username, "u");
        assert!(proxy.password.is_empty());
    }
}
