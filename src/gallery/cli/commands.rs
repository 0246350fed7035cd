//! # CLI Layer
//!
//! One possible client of the gallery library. This is the only place that
//! touches the terminal: it parses arguments, builds the API over HTTP,
//! renders results, and turns errors into exit codes.
//!
//! ## Structure
//!
//! - `run()`: Main dispatch logic (called by `main.rs`)
//! - `init_context()`: Builds `AppContext` from config plus flag overrides
//! - `handle_*()`: Per-command handlers that call the API and print
//!
//! A command whose request is rejected fails with exit code 1. `browse`
//! is the exception for nested content: a user's albums or an album's photos
//! that fail to load are reported inline, like a component tree would.

use super::render::{
    line_width, print_info, print_inline_error, print_success, render_albums, render_endpoints,
    render_photos, render_users,
};
use super::setup::{AlbumsCommand, Cli, Commands, PhotosCommand, UsersCommand};
use clap::Parser;
use directories::ProjectDirs;
use futures::future::join_all;
use gallery::api::{GalleryApi, QueryState};
use gallery::config::{GalleryConfig, KEYS};
use gallery::endpoints::names;
use gallery::error::{GalleryError, Result};
use gallery::lifecycle::RequestStatus;
use gallery::model::{Album, EntityRef, NewUser, Photo, User};
use gallery::transport::http::HttpTransport;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const ALBUM_INDENT: usize = 4;
const PHOTO_INDENT: usize = 8;

struct AppContext {
    api: GalleryApi<HttpTransport>,
    width: usize,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Config does not need a server
    if let Commands::Config { key, value } = &cli.command {
        return handle_config(&cli, key.as_deref(), value.as_deref());
    }

    let ctx = init_context(&cli)?;

    match cli.command {
        Commands::Users(cmd) => match cmd {
            UsersCommand::List => handle_users_list(&ctx).await,
            UsersCommand::Add { name } => handle_users_add(&ctx, name).await,
            UsersCommand::Remove { id } => handle_users_remove(&ctx, &id).await,
        },
        Commands::Albums(cmd) => match cmd {
            AlbumsCommand::List { user_id } => handle_albums_list(&ctx, &user_id).await,
            AlbumsCommand::Add { user_id } => handle_albums_add(&ctx, &user_id).await,
            AlbumsCommand::Remove { album_id } => handle_albums_remove(&ctx, &album_id).await,
        },
        Commands::Photos(cmd) => match cmd {
            PhotosCommand::List { album_id } => handle_photos_list(&ctx, &album_id).await,
            PhotosCommand::Add { album_id } => handle_photos_add(&ctx, &album_id).await,
            PhotosCommand::Remove { photo_id } => handle_photos_remove(&ctx, &photo_id).await,
        },
        Commands::Browse => handle_browse(&ctx).await,
        Commands::Endpoints => handle_endpoints(&ctx),
        Commands::Config { .. } => Ok(()),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "gallery=debug" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn config_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.config_dir {
        return Ok(dir.clone());
    }
    ProjectDirs::from("com", "gallery", "gallery")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| GalleryError::Config("Could not determine config dir".to_string()))
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let dir = config_dir(cli)?;
    let mut config = GalleryConfig::load(&dir).unwrap_or_else(|e| {
        warn!(dir = %dir.display(), error = %e, "ignoring unreadable config");
        GalleryConfig::default()
    });

    if let Some(base_url) = &cli.base_url {
        config.set("base-url", base_url)?;
    }
    if let Some(latency_ms) = cli.latency_ms {
        config.latency_ms = latency_ms;
    }
    debug!(base_url = %config.base_url, latency_ms = config.latency_ms, "using server");

    let transport = HttpTransport::new(&config.base_url).with_latency(config.latency());
    Ok(AppContext {
        api: GalleryApi::new(transport, &config),
        width: line_width(),
    })
}

fn entity_arg(id: &str) -> Result<Value> {
    Ok(serde_json::to_value(EntityRef::new(id))?)
}

fn decode<U: DeserializeOwned>(value: Value) -> Result<U> {
    Ok(serde_json::from_value(value)?)
}

async fn load_users(ctx: &AppContext) -> Result<Vec<User>> {
    let users = ctx.api.fetch_users().await?;
    if users.status == RequestStatus::Rejected {
        if let Some(error) = users.error {
            return Err(GalleryError::Request(error));
        }
    }
    Ok(users.data)
}

// --- Users ---

async fn handle_users_list(ctx: &AppContext) -> Result<()> {
    let users = load_users(ctx).await?;
    print!("{}", render_users(&users, ctx.width));
    Ok(())
}

async fn handle_users_add(ctx: &AppContext, name: Vec<String>) -> Result<()> {
    let new_user = if name.is_empty() {
        NewUser::random()
    } else {
        NewUser::new(name.join(" "))
    };
    let user = ctx.api.add_user(&new_user).await?.into_result()?;
    print_success(&format!("Added user {}. {}", user.id, user.name));
    Ok(())
}

async fn handle_users_remove(ctx: &AppContext, id: &str) -> Result<()> {
    let users = load_users(ctx).await?;
    let user = users
        .into_iter()
        .find(|u| u.id.as_str() == id)
        .ok_or_else(|| GalleryError::InvalidArgument(format!("No user with id {}", id)))?;

    ctx.api.remove_user(&user).await?.into_result()?;
    print_success(&format!("Removed user {}. {}", user.id, user.name));
    Ok(())
}

// --- Albums ---

async fn handle_albums_list(ctx: &AppContext, user_id: &str) -> Result<()> {
    let state = ctx
        .api
        .query(names::FETCH_ALBUMS, &entity_arg(user_id)?)
        .await?
        .decode::<Vec<Album>>()?;
    let albums = state.into_result()?;
    print!("{}", render_albums(0, &albums, ctx.width));
    Ok(())
}

async fn handle_albums_add(ctx: &AppContext, user_id: &str) -> Result<()> {
    let state = ctx.api.mutate(names::ADD_ALBUM, &entity_arg(user_id)?).await?;
    let album: Album = decode(state.into_result()?)?;
    print_success(&format!("Added album {}. {}", album.id, album.title));
    Ok(())
}

async fn handle_albums_remove(ctx: &AppContext, album_id: &str) -> Result<()> {
    ctx.api
        .mutate(names::REMOVE_ALBUM, &entity_arg(album_id)?)
        .await?
        .into_result()?;
    print_success(&format!("Removed album {}", album_id));
    Ok(())
}

// --- Photos ---

async fn handle_photos_list(ctx: &AppContext, album_id: &str) -> Result<()> {
    let state = ctx
        .api
        .query(names::FETCH_PHOTOS, &entity_arg(album_id)?)
        .await?
        .decode::<Vec<Photo>>()?;
    let photos = state.into_result()?;
    print!("{}", render_photos(0, &photos, ctx.width));
    Ok(())
}

async fn handle_photos_add(ctx: &AppContext, album_id: &str) -> Result<()> {
    let state = ctx.api.mutate(names::ADD_PHOTO, &entity_arg(album_id)?).await?;
    let photo: Photo = decode(state.into_result()?)?;
    print_success(&format!("Added photo {}. {}", photo.id, photo.title));
    Ok(())
}

async fn handle_photos_remove(ctx: &AppContext, photo_id: &str) -> Result<()> {
    ctx.api
        .mutate(names::REMOVE_PHOTO, &entity_arg(photo_id)?)
        .await?
        .into_result()?;
    print_success(&format!("Removed photo {}", photo_id));
    Ok(())
}

// --- Browse ---

async fn handle_browse(ctx: &AppContext) -> Result<()> {
    let users = load_users(ctx).await?;
    if users.is_empty() {
        print!("{}", render_users(&users, ctx.width));
        return Ok(());
    }

    let albums = join_all(users.iter().map(|user| ctx.api.fetch_albums(user))).await;
    for (user, albums) in users.iter().zip(albums) {
        print!("{}", render_users(std::slice::from_ref(user), ctx.width));
        match albums.and_then(QueryState::into_result) {
            Ok(albums) => browse_albums(ctx, &albums).await,
            Err(e) => print_inline_error(ALBUM_INDENT, &format!("Error fetching albums: {}", e)),
        }
    }
    Ok(())
}

async fn browse_albums(ctx: &AppContext, albums: &[Album]) {
    if albums.is_empty() {
        print!("{}", render_albums(ALBUM_INDENT, albums, ctx.width));
        return;
    }

    let photos = join_all(albums.iter().map(|album| ctx.api.fetch_photos(album))).await;
    for (album, photos) in albums.iter().zip(photos) {
        print!(
            "{}",
            render_albums(ALBUM_INDENT, std::slice::from_ref(album), ctx.width)
        );
        match photos.and_then(QueryState::into_result) {
            Ok(photos) => print!("{}", render_photos(PHOTO_INDENT, &photos, ctx.width)),
            Err(e) => print_inline_error(PHOTO_INDENT, &format!("Error fetching photos: {}", e)),
        }
    }
}

// --- Misc ---

fn handle_endpoints(ctx: &AppContext) -> Result<()> {
    print!("{}", render_endpoints(ctx.api.registry().iter()));
    Ok(())
}

fn handle_config(cli: &Cli, key: Option<&str>, value: Option<&str>) -> Result<()> {
    let dir = config_dir(cli)?;
    let mut config = GalleryConfig::load(&dir)?;

    match (key, value) {
        (None, _) => {
            for key in KEYS {
                println!("{} = {}", key, config.get(key)?);
            }
            print_info(&format!("({})", dir.display()));
        }
        (Some(key), None) => println!("{}", config.get(key)?),
        (Some(key), Some(value)) => {
            config.set(key, value)?;
            config.save(&dir)?;
            print_success(&format!("Set {} = {}", key, config.get(key)?));
        }
    }
    Ok(())
}
