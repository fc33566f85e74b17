pub mod candle;
pub mod row;

pub const REPORT_TITLE: &str = "Nasdaq Gap-Up Prediction Report";

pub const DISCLAIMER: &str = "⚠️ Disclaimer: This report is for educational purposes only and is not intended for real trading. If you choose to use it for trading, you do so at your own discretion and are fully responsible for your actions. By using this report, you accept that the owners of this content are not liable for any losses or issues of any kind, and you release the owners from all forms of liability at all times and locations.";
