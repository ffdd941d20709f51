use thiserror::Error;

pub mod block;
pub mod codec;

pub use block::{decode_block, encode_block, Uf2Block};
pub use codec::{container_to_raw, raw_to_container, ContainerImage, RawImage};

pub const BLOCK_LEN: usize = 512;
pub const MAGIC: u32 = 0x0A324655;
pub const HDR_MAGIC: u32 = 0x9E5D5157;
pub const FTR_MAGIC: u32 = 0x0AB16F30;
pub const FLAG_NO_FLASH: u32 = 0x00000001;
pub const FLAG_FILE_CONTAINER: u32 = 0x00001000;
pub const FLAG_FAMILY_ID: u32 = 0x00002000;
// payload bytes per block written by the encoder
pub const DATA_LEN: usize = 256;
pub const MAX_DATA_LEN: usize = PADDING_END - DATA_START;
// anything further away than this is treated as a corrupt image
pub const DEFAULT_MAX_PADDING: u64 = 10 * 1024 * 1024;
const DATA_START: usize = 0x20;
const PADDING_END: usize = BLOCK_LEN - 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Info
{
	Unused,
	Reserved(u32),
	FileSize(u32),
	BoardFamily(u32),
}

impl Info
{
	fn from_word(flags: u32, word: u32) -> Self
	{
		if flags & FLAG_FAMILY_ID != 0 {Info::BoardFamily(word)}
		else if flags & FLAG_FILE_CONTAINER != 0 {Info::FileSize(word)}
		else if word == 0 {Info::Unused}
		else {Info::Reserved(word)}
	}
	
	fn flags(&self) -> u32
	{
		match self
		{
			Info::BoardFamily(..) => FLAG_FAMILY_ID,
			Info::FileSize(..) => FLAG_FILE_CONTAINER,
			Info::Unused | Info::Reserved(..) => 0,
		}
	}
	
	fn word(&self) -> u32
	{
		match self
		{
			Info::Unused => 0,
			Info::Reserved(val) | Info::FileSize(val) | Info::BoardFamily(val) => *val,
		}
	}
	
	pub fn board_tag(&self) -> Option<u32>
	{
		match self
		{
			Info::BoardFamily(fid) => Some(*fid),
			_ => None,
		}
	}
}

impl From<Option<u32>> for Info
{
	fn from(board_tag: Option<u32>) -> Self
	{
		match board_tag
		{
			None => Info::Unused,
			Some(fid) => Info::BoardFamily(fid),
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MagicWord
{
	Start0,
	Start1,
	End,
}

impl MagicWord
{
	pub fn expected(&self) -> u32
	{
		match self
		{
			MagicWord::Start0 => MAGIC,
			MagicWord::Start1 => HDR_MAGIC,
			MagicWord::End => FTR_MAGIC,
		}
	}
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum FormatError
{
	#[error("container length {len} is not a multiple of the block size ({})", BLOCK_LEN)]
	Length{len: usize},
	#[error("bad {which:?} magic in block {block} (expected {:#010X}, got {have:#010X})", .which.expected())]
	BadMagic{block: usize, which: MagicWord, have: u32},
	#[error("payload of block {block} too large ({len} bytes, max {max})")]
	PayloadTooLarge{block: usize, len: usize, max: usize},
	#[error("block {block} out of order (expected address {expect:#X} or above, got {addr:#X})")]
	OutOfOrder{block: usize, expect: u64, addr: u32},
	#[error("block {block} needs {padding} bytes of padding (limit {limit})")]
	ExcessivePadding{block: usize, padding: u64, limit: u64},
	#[error("block {block} needs non-word padding ({padding} bytes)")]
	Misaligned{block: usize, padding: u64},
	#[error("address overflow at block {block} ({addr:#X} + {len} bytes)")]
	AddressOverflow{block: usize, addr: u32, len: usize},
}

impl FormatError
{
	// the block codec only ever sees one block, the converters know where it sits
	pub(crate) fn at(self, pos: usize) -> Self
	{
		match self
		{
			Self::BadMagic{which, have, ..} => Self::BadMagic{block: pos, which, have},
			Self::PayloadTooLarge{len, max, ..} => Self::PayloadTooLarge{block: pos, len, max},
			Self::OutOfOrder{expect, addr, ..} => Self::OutOfOrder{block: pos, expect, addr},
			Self::ExcessivePadding{padding, limit, ..} => Self::ExcessivePadding{block: pos, padding, limit},
			Self::Misaligned{padding, ..} => Self::Misaligned{block: pos, padding},
			Self::AddressOverflow{addr, len, ..} => Self::AddressOverflow{block: pos, addr, len},
			err @ Self::Length{..} => err,
		}
	}
	
	pub fn block(&self) -> Option<usize>
	{
		match self
		{
			Self::Length{..} => None,
			Self::BadMagic{block, ..} | Self::PayloadTooLarge{block, ..} | Self::OutOfOrder{block, ..}
				| Self::ExcessivePadding{block, ..} | Self::Misaligned{block, ..} | Self::AddressOverflow{block, ..} => Some(*block),
		}
	}
}
