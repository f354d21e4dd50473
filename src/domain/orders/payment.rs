//! The hosted payment page redirect.

use rust_decimal::Decimal;

use crate::domain::{OrderId, cart::round_money};

use super::{Customer, Order};

/// Merchant account and the URLs the payment processor sends the customer back to.
/// URLs may contain `{order_id}`, which is replaced with the order being paid for.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct PaymentSettings {
    pub process_url: String,
    pub merchant_id: String,
    pub merchant_key: String,
    pub return_url: String,
    pub cancel_url: String,
    pub notify_url: String,
    #[serde(default = "default_item_name_prefix")]
    pub item_name_prefix: String,
}

fn default_item_name_prefix() -> String {
    "Food order".to_owned()
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub value: String,
}

/// Everything needed to send the customer to the payment processor.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct PaymentRedirect {
    pub order_id: OrderId,
    pub action: String,
    pub fields: Vec<FormField>,
}

impl PaymentRedirect {
    pub fn new(settings: &PaymentSettings, order: &Order, customer: &Customer) -> Self {
        let order_id = order.id.to_string();
        let url = |template: &str| template.replace("{order_id}", &order_id);

        let fields = [
            ("merchant_id", settings.merchant_id.clone()),
            ("merchant_key", settings.merchant_key.clone()),
            ("return_url", url(&settings.return_url)),
            ("cancel_url", url(&settings.cancel_url)),
            ("notify_url", url(&settings.notify_url)),
            ("name_first", customer.first_name.clone()),
            ("email_address", customer.email.clone()),
            ("m_payment_id", order_id.clone()),
            ("amount", format_amount(order.total)),
            (
                "item_name",
                format!("{} {}", settings.item_name_prefix, order.order_number),
            ),
            (
                "item_description",
                format!("Order {} for {}", order.order_number, customer.first_name),
            ),
        ]
        .into_iter()
        .map(|(name, value)| FormField { name, value })
        .collect();

        Self {
            order_id: order.id,
            action: settings.process_url.clone(),
            fields,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }

    /// A page that posts the form to the processor as soon as it loads.
    pub fn render_form(&self) -> String {
        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<body onload=\"document.forms[0].submit()\">\n",
        );
        html.push_str(&format!(
            "<form action=\"{}\" method=\"post\">\n",
            escape_html(&self.action)
        ));
        for field in &self.fields {
            html.push_str(&format!(
                "<input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                field.name,
                escape_html(&field.value)
            ));
        }
        html.push_str("<noscript><button type=\"submit\">Continue to payment</button></noscript>\n");
        html.push_str("</form>\n</body>\n</html>\n");
        html
    }
}

/// Always two decimals, e.g. `182.49` or `200.00`.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

//-------------------------- Tests -------------------------------
