pub fn system_prompt() -> &'static str {
    "你是公司內部的人資規章助理，只依據提供的規章內容回答員工問題。"
}

pub fn grounded_prompt(question: &str, context_block: &str, deferral: &str) -> String {
    // Contract with the model:
    // - answer only from the context block
    // - emit the deferral sentinel verbatim when the context does not cover the question
    format!(
        r#"請依照下列規章內容，用專業、清楚、簡短的方式回答員工問題。

規則：
1) 只能使用「規章內容」中的資訊，不得自行推測或補充。
2) 若規章內容不足以回答，請只回覆「{deferral}」，不要加上其他文字。
3) 不需要重複引用條文編號標記。

規章內容：
{context_block}

員工問題：
{question}
"#
    )
}
