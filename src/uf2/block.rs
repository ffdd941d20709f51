use crate::uf2::{BLOCK_LEN, DATA_LEN, DATA_START, FLAG_NO_FLASH, FTR_MAGIC, FormatError, HDR_MAGIC, Info, MAGIC, MAX_DATA_LEN, MagicWord, PADDING_END};


#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Uf2Block<'l>
{
	pub flags: u32,
	pub no_flash: bool,
	pub addr: u32,
	pub index: u32,
	pub count: u32,
	pub info: Info,
	pub data: &'l [u8],
}

fn read_word(src: &[u8], offset: usize) -> u32
{
	let mut word = [0u8; 4];
	word.copy_from_slice(&src[offset..offset + 4]);
	u32::from_le_bytes(word)
}

fn write_word(dst: &mut [u8], offset: usize, value: u32)
{
	dst[offset..offset + 4].copy_from_slice(&u32::to_le_bytes(value));
}

impl<'l> Uf2Block<'l>
{
	pub fn new(no_flash: bool, addr: u32, index: u32, count: u32, info: Info, data: &'l [u8]) -> Result<Self, FormatError>
	{
		if data.len() > MAX_DATA_LEN
		{
			return Err(FormatError::PayloadTooLarge{block: index as usize, len: data.len(), max: MAX_DATA_LEN});
		}
		let flags = info.flags() | if no_flash {FLAG_NO_FLASH} else {0};
		Ok(Self{flags, no_flash, addr, index, count, info, data})
	}
	
	pub fn read(src: &'l [u8]) -> Result<Self, FormatError>
	{
		if src.len() < BLOCK_LEN
		{
			return Err(FormatError::Length{len: src.len()});
		}
		let src = &src[..BLOCK_LEN];
		for (offset, which) in [(0x000, MagicWord::Start0), (0x004, MagicWord::Start1), (PADDING_END, MagicWord::End)]
		{
			let have = read_word(src, offset);
			if have != which.expected()
			{
				return Err(FormatError::BadMagic{block: 0, which, have});
			}
		}
		let flags = read_word(src, 0x008);
		let len = read_word(src, 0x010) as usize;
		if len > MAX_DATA_LEN
		{
			return Err(FormatError::PayloadTooLarge{block: 0, len, max: MAX_DATA_LEN});
		}
		Ok(Self
		{
			flags,
			no_flash: flags & FLAG_NO_FLASH != 0,
			addr: read_word(src, 0x00C),
			index: read_word(src, 0x014),
			count: read_word(src, 0x018),
			info: Info::from_word(flags, read_word(src, 0x01C)),
			data: &src[DATA_START..DATA_START + len],
		})
	}
	
	pub fn write(&self, dst: &mut [u8]) -> Result<usize, FormatError>
	{
		if dst.len() < BLOCK_LEN
		{
			return Err(FormatError::Length{len: dst.len()});
		}
		let dst = &mut dst[..BLOCK_LEN];
		write_word(dst, 0x000, MAGIC);
		write_word(dst, 0x004, HDR_MAGIC);
		write_word(dst, 0x008, self.flags);
		write_word(dst, 0x00C, self.addr);
		write_word(dst, 0x010, self.data.len() as u32);
		write_word(dst, 0x014, self.index);
		write_word(dst, 0x018, self.count);
		write_word(dst, 0x01C, self.info.word());
		let data_end = DATA_START + self.data.len();
		dst[DATA_START..data_end].copy_from_slice(self.data);
		dst[data_end..PADDING_END].fill(0);
		write_word(dst, PADDING_END, FTR_MAGIC);
		Ok(BLOCK_LEN)
	}
	
	pub fn end_addr(&self) -> u64
	{
		self.addr as u64 + self.data.len() as u64
	}
}

pub fn decode_block(src: &[u8]) -> Result<Uf2Block<'_>, FormatError>
{
	Uf2Block::read(src)
}

pub fn encode_block(addr: u32, payload: &[u8], index: u32, count: u32, board_tag: Option<u32>) -> Result<[u8; BLOCK_LEN], FormatError>
{
	if payload.len() > DATA_LEN
	{
		return Err(FormatError::PayloadTooLarge{block: index as usize, len: payload.len(), max: DATA_LEN});
	}
	let mut dst = [0u8; BLOCK_LEN];
	Uf2Block::new(false, addr, index, count, Info::from(board_tag), payload)?.write(&mut dst)?;
	Ok(dst)
}

// sequence index without validating the rest of the block
pub(crate) fn peek_index(src: &[u8]) -> u32
{
	read_word(src, 0x014)
}
