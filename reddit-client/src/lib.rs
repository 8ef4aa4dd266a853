pub mod api;


pub use api::{
    RedditApiClient, RedditClientConfig, RedditListing, RedditListingChild, RedditListingData,
    RedditPostData, RedditPreview, RedditVideoPreview,
};
