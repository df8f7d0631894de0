//! User-facing reply texts.

pub const BIND_INSTRUCTIONS: &str = "請輸入格式：員編：XXXX，進行綁定";
pub const UNRECOGNIZED: &str = "輸入錯誤，請重試";

pub const ALREADY_REGISTERED: &str = "你已經登記過囉，不需要重複填寫～";
pub const CODE_TAKEN: &str = "⚠️ 此員編已被使用，請確認後再填寫";
pub const REGISTRATION_LOOKUP_FAILED: &str = "❌ 查詢失敗，請稍後再試";
pub const REGISTRATION_WRITE_FAILED: &str = "❌ 登記資料寫入失敗，請稍後再試";

pub const NOT_REGISTERED: &str = "❌ 找不到你的員編資料，請先登記員編";
pub const MEETING_LOOKUP_FAILED: &str = "❌ 取得會議資訊失敗，請稍後再試";

pub const UNTITLED_MEETING: &str = "未命名會議";
pub const LOCATION_NOT_SPECIFIED: &str = "未填寫";

pub fn registered(staff_code: &str) -> String {
    format!("✅ 已成功登記員編：{}", staff_code)
}

pub fn no_meetings(today_display: &str) -> String {
    format!("{} 今天沒有會議喔！", today_display)
}

pub fn report_header(today_display: &str) -> String {
    format!("{} 會議提醒", today_display)
}
