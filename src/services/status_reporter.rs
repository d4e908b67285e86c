use crate::models::StatusColor;

/// Receives the sync status line shown in the header
pub trait StatusReporter {
    fn report(&self, text: &str, color: StatusColor);
}

#[cfg(target_arch = "wasm32")]
pub use dom::DomStatusReporter;

#[cfg(target_arch = "wasm32")]
mod dom {
    use web_sys::window;

    use super::StatusReporter;
    use crate::models::StatusColor;
    use crate::utils::constants::{STATUS_ELEMENT_SELECTOR, STATUS_ICON_SELECTOR};

    /// Writes the status into `#sync-status` / `#sync-status-scan` and
    /// recolors the wifi icon
    #[derive(Clone, Copy, Debug, Default)]
    pub struct DomStatusReporter;

    impl DomStatusReporter {
        fn icon_class(text: &str, color: StatusColor) -> String {
            if text.starts_with("Syncing") {
                return "fa-solid fa-spinner fa-spin text-yellow-400".to_string();
            }
            match color {
                StatusColor::Green => "fa-solid fa-wifi".to_string(),
                StatusColor::Yellow => "fa-solid fa-wifi text-yellow-400".to_string(),
                StatusColor::Red => "fa-solid fa-wifi text-red-400 animate-pulse".to_string(),
            }
        }

        fn tailwind_color(color: StatusColor) -> &'static str {
            match color {
                StatusColor::Green => "green",
                StatusColor::Yellow => "yellow",
                StatusColor::Red => "red",
            }
        }
    }

    impl StatusReporter for DomStatusReporter {
        fn report(&self, text: &str, color: StatusColor) {
            let document = match window().and_then(|w| w.document()) {
                Some(document) => document,
                None => return,
            };

            if let Ok(nodes) = document.query_selector_all(STATUS_ELEMENT_SELECTOR) {
                for i in 0..nodes.length() {
                    if let Some(node) = nodes.item(i) {
                        node.set_text_content(Some(&format!(" {}", text)));
                    }
                }
            }

            if let Ok(Some(icon)) = document.query_selector(STATUS_ICON_SELECTOR) {
                icon.set_class_name(&Self::icon_class(text, color));
                if let Some(parent) = icon.parent_element() {
                    parent.set_class_name(&format!(
                        "text-xs text-{}-400 font-bold transition-all",
                        Self::tailwind_color(color)
                    ));
                }
            }
        }
    }
}
