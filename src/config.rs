use crate::uf2::DEFAULT_MAX_PADDING;

pub const DEFAULT_BASE_ADDRESS: u32 = 0x2000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config
{
	pub base_address: u32,
	pub board_tag: Option<u32>,
	pub max_padding: u64,
}

impl Config
{
	pub fn new(base_address: u32) -> Self
	{
		Self{base_address, ..Self::default()}
	}
	
	pub fn with_board_tag(self, board_tag: Option<u32>) -> Self
	{
		Self{board_tag, ..self}
	}
	
	pub fn with_max_padding(self, max_padding: u64) -> Self
	{
		Self{max_padding, ..self}
	}
}

impl Default for Config
{
	fn default() -> Self
	{
		Self{base_address: DEFAULT_BASE_ADDRESS, board_tag: None, max_padding: DEFAULT_MAX_PADDING}
	}
}
