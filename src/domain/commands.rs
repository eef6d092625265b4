#[derive(Debug, PartialEq)]
pub enum SamplerCommand {
    Start,
    Stop,
}
