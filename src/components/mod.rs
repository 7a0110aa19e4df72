use yew::prelude::*;
use web_sys::*;


/// The pay button. Content comes from children so the label can carry markup.
#[derive(Properties, PartialEq)]
pub struct ButtonProps {
    /// DOM id, so page styles written for the server-rendered button still apply
    #[prop_or_default]
    pub id: Option<AttrValue>,
    /// Click handler
    pub onclick: Callback<MouseEvent>,
    /// Disable state
    #[prop_or_default]
    pub disabled: bool,
    #[prop_or_default]
    pub children: Children,
}

#[function_component(Button)]
pub fn button(props: &ButtonProps) -> Html {
    html! {
        <button
            id={props.id.clone()}
            type="button"
            onclick={props.onclick.clone()}
            disabled={props.disabled}
            class="pay-btn"
        >
            { for props.children.iter() }
        </button>
    }
}

/// A controlled input for the customer's phone number.
#[derive(Properties, PartialEq)]
pub struct TextInputProps {
    #[prop_or_default]
    pub id: Option<AttrValue>,
    /// Current value
    pub value: String,
    /// Emits new value on each keystroke
    pub oninput: Callback<String>,
    /// Placeholder text
    #[prop_or_default]
    pub placeholder: String,
    /// `type` attribute; plain text unless overridden
    #[prop_or(AttrValue::Static("text"))]
    pub input_type: AttrValue,
}

#[function_component(TextInput)]
pub fn text_input(props: &TextInputProps) -> Html {
    let oninput = props.oninput.clone();
    html! {
        <input
            id={props.id.clone()}
            type={props.input_type.clone()}
            class="checkout-input"
            value={props.value.clone()}
            placeholder={props.placeholder.clone()}
            oninput={Callback::from(move |e: InputEvent| {
                let input: HtmlInputElement = e.target_unchecked_into();
                oninput.emit(input.value());
            })}
        />
    }
}
