//! Asset loading: file/URL fetch helpers and the fire-and-forget registry.
//!
//! [`AssetServer::spawn`] takes a decode future plus an apply callback. The
//! future runs off the main thread (a tokio task natively, `spawn_local` on
//! the web) and must only produce owned CPU-side payloads; the apply callback
//! runs back on the event-loop thread, between frames, and is where scene
//! graph nodes, players, tracks and panel bindings come into existence.
//!
//! A load either completes exactly once or never; failures are logged and
//! dropped, leaving whatever depended on the asset inert. There is no retry
//! and no cancellation.

use std::sync::Arc;

use crate::context::Context;
use crate::panel::Panel;
use crate::state::SceneState;

pub mod audio;
pub mod gltf;

/// A resolved load completion, applied on the event-loop thread.
#[cfg(not(target_arch = "wasm32"))]
pub type Mutation = Box<dyn FnOnce(&mut Context, &mut SceneState, &mut Panel) + Send>;
#[cfg(target_arch = "wasm32")]
pub type Mutation = Box<dyn FnOnce(&mut Context, &mut SceneState, &mut Panel)>;

/// Delivery seam between background loads and the event loop. The orchestrator
/// implements this over its event-loop proxy; tests swap in a channel.
#[cfg(not(target_arch = "wasm32"))]
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, mutation: Mutation);
}
#[cfg(target_arch = "wasm32")]
pub trait Dispatch {
    fn dispatch(&self, mutation: Mutation);
}

/// Issues load requests and routes their completions back to the orchestrator.
#[derive(Clone)]
pub struct AssetServer {
    dispatch: Arc<dyn Dispatch>,
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Handle,
}

impl AssetServer {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(dispatch: Arc<dyn Dispatch>, runtime: tokio::runtime::Handle) -> Self {
        Self { dispatch, runtime }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn new(dispatch: Arc<dyn Dispatch>) -> Self {
        Self { dispatch }
    }

    /// Fire and forget: decode via `load`, then apply the result to the shared
    /// state. `label` only serves the failure log.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn spawn<T, F, A>(&self, label: impl Into<String>, load: F, apply: A)
    where
        T: Send + 'static,
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
        A: FnOnce(T, &mut Context, &mut SceneState, &mut Panel) + Send + 'static,
    {
        let dispatch = Arc::clone(&self.dispatch);
        let label = label.into();
        self.runtime.spawn(async move {
            match load.await {
                Ok(payload) => dispatch.dispatch(Box::new(move |ctx, state, panel| {
                    apply(payload, ctx, state, panel)
                })),
                Err(e) => {
                    log::warn!("asset load '{label}' failed, dependent features stay inert: {e:#}")
                }
            }
        });
    }

    #[cfg(target_arch = "wasm32")]
    pub fn spawn<T, F, A>(&self, label: impl Into<String>, load: F, apply: A)
    where
        T: 'static,
        F: Future<Output = anyhow::Result<T>> + 'static,
        A: FnOnce(T, &mut Context, &mut SceneState, &mut Panel) + 'static,
    {
        let dispatch = Arc::clone(&self.dispatch);
        let label = label.into();
        wasm_bindgen_futures::spawn_local(async move {
            match load.await {
                Ok(payload) => dispatch.dispatch(Box::new(move |ctx, state, panel| {
                    apply(payload, ctx, state, panel)
                })),
                Err(e) => {
                    log::warn!("asset load '{label}' failed, dependent features stay inert: {e:#}")
                }
            }
        });
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> reqwest::Url {
    let window = web_sys::window().unwrap();
    let location = window.location();
    let origin = location.origin().unwrap();
    let base = reqwest::Url::parse(&format!("{}/assets/", origin)).unwrap();
    base.join(file_name).unwrap()
}

#[cfg(not(target_arch = "wasm32"))]
fn asset_path(file_name: &str) -> std::path::PathBuf {
    let root = std::env::var("VIGNETTE_ASSETS").unwrap_or_else(|_| "assets".to_string());
    std::path::Path::new(&root).join(file_name)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name);
        reqwest::get(url).await?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = tokio::fs::read_to_string(asset_path(file_name)).await?;

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name);
        reqwest::get(url).await?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = tokio::fs::read(asset_path(file_name)).await?;

    Ok(data)
}
