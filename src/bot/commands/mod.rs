use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "Показать это сообщение")]
    Help,
    #[command(description = "Главное меню")]
    Start,
    #[command(description = "Прервать текущий тест или настройку")]
    Cancel,
    #[command(description = "Выбрать тест")]
    Test,
    #[command(description = "История пройденных тестов")]
    History,
}
