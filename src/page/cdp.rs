//! chromiumoxide implementation of [`HostPage`]
//!
//! All DOM work is done through parameterized `Runtime.callFunctionOn`
//! evaluations; selectors and event names are passed as arguments, never
//! spliced into script text.

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide_cdp::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, RemoveScriptToEvaluateOnNewDocumentParams,
    ScriptIdentifier,
};
use chromiumoxide_cdp::cdp::js_protocol::runtime::{
    AddBindingParams, CallArgument, CallFunctionOnParams, EventBindingCalled, RemoveBindingParams,
};
use futures::StreamExt;
use parking_lot::Mutex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{ElementRef, HostPage, LazyInstanceUpdate, RowColumns, ScrollSignal};
use crate::config::{DetailLayout, ListLayout};
use crate::utils::constants::{ELEMENT_REF_ATTRIBUTE, LAZY_ELEMENT_SELECTOR, SCROLL_BINDING_NAME};
use crate::utils::{HarvestError, HarvestResult};

/// Forwards trusted scroll/touch input to the binding. Synthetic events
/// dispatched by the trigger are untrusted and stay on the page.
const SCROLL_LISTENER_JS: &str = r#"(() => {
  if (window.__harvesterScrollInstalled) return true;
  window.__harvesterScrollInstalled = true;
  const forward = (event) => {
    if (event.isTrusted && typeof window.__BINDING__ === 'function') {
      window.__BINDING__(event.type);
    }
  };
  window.__harvesterScrollForward = forward;
  window.addEventListener('scroll', forward, { passive: true });
  window.addEventListener('touchmove', forward, { passive: true });
  return true;
})()"#;

const SCROLL_LISTENER_REMOVE_JS: &str = r#"(() => {
  const forward = window.__harvesterScrollForward;
  if (forward) {
    window.removeEventListener('scroll', forward);
    window.removeEventListener('touchmove', forward);
  }
  delete window.__harvesterScrollForward;
  window.__harvesterScrollInstalled = false;
  return true;
})()"#;

const READ_ROWS_JS: &str = r#"(container, row, keyCell, name, button, attr) => {
  const root = document.querySelector(container);
  const out = { present: root !== null, keys: [], controls: [], names: [] };
  if (!root) return out;
  window.__harvesterRefSeq = window.__harvesterRefSeq || 0;
  root.querySelectorAll(row).forEach((tr) => {
    const key = tr.querySelector(keyCell);
    const control = tr.querySelector(button);
    if (!key || !control) return;
    if (!control.hasAttribute(attr)) {
      control.setAttribute(attr, String(++window.__harvesterRefSeq));
    }
    const label = tr.querySelector(name);
    out.keys.push(key.innerText.trim());
    out.controls.push(control.getAttribute(attr));
    out.names.push(label ? label.innerText.trim() : '');
  });
  return out;
}"#;

const READ_DETAIL_JS: &str = r#"(dialog, table) => {
  const surface = document.querySelector(dialog);
  const grid = surface ? surface.querySelector(table) : null;
  if (!grid) return { present: false, rows: [] };
  const rows = grid.tBodies.length
    ? Array.from(grid.tBodies).flatMap((body) => Array.from(body.rows))
    : Array.from(grid.rows);
  return {
    present: true,
    rows: rows.map((tr) => Array.from(tr.cells).map((cell) => cell.innerText.trim())),
  };
}"#;

const CLOSE_DETAIL_JS: &str = r#"(dialog, group) => {
  const surface = document.querySelector(dialog);
  if (!surface) return false;
  const buttons = surface.querySelectorAll(group + ' button');
  if (buttons.length === 0) return false;
  buttons[buttons.length - 1].click();
  return true;
}"#;

#[derive(Deserialize)]
struct RowsPayload {
    present: bool,
    keys: Vec<String>,
    controls: Vec<String>,
    names: Vec<String>,
}

#[derive(Deserialize)]
struct DetailPayload {
    present: bool,
    rows: Vec<Vec<String>>,
}

/// Live scroll listener installation on the page
struct SignalSubscription {
    task: JoinHandle<()>,
    script: ScriptIdentifier,
}

pub struct CdpPage {
    page: Page,
    signals: Mutex<Option<SignalSubscription>>,
}

impl CdpPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            signals: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &Page {
        &self.page
    }

    async fn call<T: DeserializeOwned>(&self, function: &str, args: Vec<Value>) -> HarvestResult<T> {
        let mut builder = CallFunctionOnParams::builder()
            .function_declaration(function)
            .return_by_value(true);
        for arg in args {
            builder = builder.argument(CallArgument::builder().value(arg).build());
        }
        let call = builder
            .build()
            .map_err(|e| HarvestError::Page(format!("Failed to build call params: {}", e)))?;

        let result = self
            .page
            .evaluate_function(call)
            .await
            .map_err(|e| HarvestError::Page(format!("Page script failed: {}", e)))?;

        result
            .into_value::<T>()
            .map_err(|e| HarvestError::Page(format!("Unexpected script result: {}", e)))
    }
}

#[async_trait]
impl HostPage for CdpPage {
    async fn scroll_offset(&self) -> HarvestResult<f64> {
        self.call(
            "() => window.pageYOffset || document.documentElement.scrollTop || 0",
            vec![],
        )
        .await
    }

    async fn scroll_by(&self, dy: f64) -> HarvestResult<()> {
        self.call::<bool>(
            "(dy) => { window.scrollBy({ top: dy, behavior: 'auto' }); return true; }",
            vec![json!(dy)],
        )
        .await
        .map(|_| ())
    }

    async fn scroll_to(&self, y: f64) -> HarvestResult<()> {
        self.call::<bool>(
            "(y) => { window.scrollTo({ top: y, behavior: 'auto' }); return true; }",
            vec![json!(y)],
        )
        .await
        .map(|_| ())
    }

    async fn scroll_to_bottom(&self) -> HarvestResult<()> {
        self.call::<bool>(
            "() => { window.scrollTo({ top: Math.max(document.body.scrollHeight, document.documentElement.scrollHeight), behavior: 'auto' }); return true; }",
            vec![],
        )
        .await
        .map(|_| ())
    }

    async fn dispatch_window_event(&self, name: &str) -> HarvestResult<()> {
        self.call::<bool>(
            "(name) => { window.dispatchEvent(new Event(name)); return true; }",
            vec![json!(name)],
        )
        .await
        .map(|_| ())
    }

    async fn element_exists(&self, selector: &str) -> HarvestResult<bool> {
        self.call(
            "(selector) => document.querySelector(selector) !== null",
            vec![json!(selector)],
        )
        .await
    }

    async fn dispatch_element_event(&self, selector: &str, name: &str) -> HarvestResult<()> {
        let dispatched: bool = self
            .call(
                "(selector, name) => { const el = document.querySelector(selector); if (!el) return false; el.dispatchEvent(new Event(name)); return true; }",
                vec![json!(selector), json!(name)],
            )
            .await?;
        if dispatched {
            Ok(())
        } else {
            Err(HarvestError::Page(format!("Element '{}' not found", selector)))
        }
    }

    async fn update_lazy_instance(&self) -> HarvestResult<LazyInstanceUpdate> {
        let updated: bool = self
            .call(
                "() => { const lazy = window.lazyLoadInstance; if (!lazy || typeof lazy.update !== 'function') return false; lazy.update(); return true; }",
                vec![],
            )
            .await?;
        Ok(if updated {
            LazyInstanceUpdate::Updated
        } else {
            LazyInstanceUpdate::Absent
        })
    }

    async fn count_lazy_elements(&self) -> HarvestResult<usize> {
        self.call(
            "(selector) => document.querySelectorAll(selector).length",
            vec![json!(LAZY_ELEMENT_SELECTOR)],
        )
        .await
    }

    async fn read_rows(&self, layout: &ListLayout) -> HarvestResult<Option<RowColumns>> {
        let payload: RowsPayload = self
            .call(
                READ_ROWS_JS,
                vec![
                    json!(layout.container),
                    json!(layout.row),
                    json!(layout.key_cell),
                    json!(layout.name),
                    json!(layout.detail_button),
                    json!(ELEMENT_REF_ATTRIBUTE),
                ],
            )
            .await?;

        if !payload.present {
            return Ok(None);
        }
        let controls = payload
            .controls
            .into_iter()
            .map(|id| ElementRef::new(format!("[{}=\"{}\"]", ELEMENT_REF_ATTRIBUTE, id)))
            .collect();
        Ok(Some(RowColumns {
            keys: payload.keys,
            controls,
            names: payload.names,
        }))
    }

    async fn activate(&self, control: &ElementRef) -> HarvestResult<()> {
        let selector = control.selector();
        let element = self.page.find_element(selector).await.map_err(|e| {
            HarvestError::Page(format!("Control '{}' not found: {}", selector, e))
        })?;

        element.scroll_into_view().await.map_err(|e| {
            HarvestError::Page(format!(
                "Failed to scroll control '{}' into view: {}",
                selector, e
            ))
        })?;

        // Clicking the point directly avoids the IntersectionObserver wait
        // in Element::click.
        let point = element.clickable_point().await.map_err(|e| {
            HarvestError::Page(format!(
                "Control '{}' has no clickable point, it may be hidden: {}",
                selector, e
            ))
        })?;

        self.page
            .click(point)
            .await
            .map_err(|e| HarvestError::Page(format!("Click on '{}' failed: {}", selector, e)))?;
        Ok(())
    }

    async fn read_detail_table(
        &self,
        layout: &DetailLayout,
    ) -> HarvestResult<Option<Vec<Vec<String>>>> {
        let payload: DetailPayload = self
            .call(READ_DETAIL_JS, vec![json!(layout.dialog), json!(layout.table)])
            .await?;
        Ok(payload.present.then_some(payload.rows))
    }

    async fn close_detail(&self, layout: &DetailLayout) -> HarvestResult<bool> {
        self.call(
            CLOSE_DETAIL_JS,
            vec![json!(layout.dialog), json!(layout.button_group)],
        )
        .await
    }

    async fn subscribe_scroll_signals(&self) -> HarvestResult<mpsc::UnboundedReceiver<ScrollSignal>> {
        let subscribed = self.signals.lock().is_some();
        if subscribed {
            self.unsubscribe_scroll_signals().await?;
        }

        let mut events = self
            .page
            .event_listener::<EventBindingCalled>()
            .await
            .map_err(|e| HarvestError::Page(format!("Binding listener failed: {}", e)))?;

        self.page
            .execute(AddBindingParams::new(SCROLL_BINDING_NAME))
            .await
            .map_err(|e| HarvestError::Page(format!("Adding scroll binding failed: {}", e)))?;

        let script = SCROLL_LISTENER_JS.replace("__BINDING__", SCROLL_BINDING_NAME);
        let registered = self
            .page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(script.clone()))
            .await
            .map_err(|e| HarvestError::Page(format!("Registering scroll listener failed: {}", e)))?;
        let script_id = registered.result.identifier.clone();
        self.page
            .evaluate(script)
            .await
            .map_err(|e| HarvestError::Page(format!("Installing scroll listener failed: {}", e)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.name != SCROLL_BINDING_NAME {
                    continue;
                }
                let signal = if event.payload == "touchmove" {
                    ScrollSignal::TouchMove
                } else {
                    ScrollSignal::Scroll
                };
                if tx.send(signal).is_err() {
                    break;
                }
            }
            debug!("Scroll signal forwarding ended");
        });

        let subscription = SignalSubscription {
            task,
            script: script_id,
        };
        if let Some(previous) = self.signals.lock().replace(subscription) {
            previous.task.abort();
        }
        info!("Scroll listener installed");
        Ok(rx)
    }

    async fn unsubscribe_scroll_signals(&self) -> HarvestResult<()> {
        let subscription = self.signals.lock().take();
        let Some(subscription) = subscription else {
            return Ok(());
        };
        subscription.task.abort();

        self.page
            .evaluate(SCROLL_LISTENER_REMOVE_JS.to_string())
            .await
            .map_err(|e| HarvestError::Page(format!("Removing scroll listener failed: {}", e)))?;
        self.page
            .execute(RemoveBindingParams::new(SCROLL_BINDING_NAME))
            .await
            .map_err(|e| HarvestError::Page(format!("Removing scroll binding failed: {}", e)))?;
        self.page
            .execute(RemoveScriptToEvaluateOnNewDocumentParams::new(
                subscription.script,
            ))
            .await
            .map_err(|e| {
                HarvestError::Page(format!("Unregistering scroll listener failed: {}", e))
            })?;

        info!("Scroll listener removed");
        Ok(())
    }
}

impl Drop for CdpPage {
    fn drop(&mut self) {
        if let Some(subscription) = self.signals.get_mut().take() {
            subscription.task.abort();
        }
    }
}
