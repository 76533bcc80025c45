//! Loading indicators.

use dioxus::prelude::*;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SpinnerSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl SpinnerSize {
    fn px(self) -> u32 {
        match self {
            SpinnerSize::Small => 16,
            SpinnerSize::Medium => 32,
            SpinnerSize::Large => 48,
        }
    }
}

#[component]
pub fn LoadingSpinner(#[props(default)] size: SpinnerSize) -> Element {
    let px = size.px();
    rsx! {
        div {
            class: "loading-spinner",
            style: "display: inline-block; width: {px}px; height: {px}px; border: 4px solid #059669; border-right-color: transparent; border-radius: 50%; animation: spin 0.8s linear infinite;",
        }
        style { "@keyframes spin {{ to {{ transform: rotate(360deg); }} }}" }
    }
}

/// Full-page spinner with a message.
#[component]
pub fn LoadingPage(#[props(default = "Loading...".to_string())] message: String) -> Element {
    rsx! {
        div {
            style: "display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh;",
            LoadingSpinner { size: SpinnerSize::Large }
            p { style: "margin-top: 1rem; color: #047857; font-weight: 500;", "{message}" }
        }
    }
}
